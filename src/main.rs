use std::{
    io::Read,
    path::{Path, PathBuf},
};

use clap::Parser;
use scim_patch::{
    config::ScimPatchConfig,
    observability,
    scim::{PatchEngine, PatchRequest, ScimErrorResponse},
};
use serde::Serialize;
use serde_json::Value;

/// CLI arguments for scim-patch
#[derive(Parser, Debug)]
#[command(version, about = "Apply SCIM 2.0 PATCH requests to resources", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Apply a PatchOp request to a resource and print the result
    Apply {
        /// Resource type name (e.g. User, Group)
        #[arg(short = 't', long)]
        resource_type: String,
        /// Resource JSON file (`-` for stdin)
        #[arg(short, long)]
        resource: PathBuf,
        /// PatchOp request JSON file (`-` for stdin)
        #[arg(short, long)]
        patch: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the resource types known to the schema registry
    ResourceTypes,
    /// Export the JSON schema for the configuration file
    Schema {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let args = Args::parse();

    match args.command {
        Command::Apply {
            resource_type,
            resource,
            patch,
            output,
        } => {
            let config = load_config(args.config.as_deref());
            run_apply(&config, &resource_type, &resource, &patch, output.as_deref());
        }
        Command::ResourceTypes => {
            let config = load_config(args.config.as_deref());
            run_resource_types(&config);
        }
        Command::Schema { output } => {
            #[cfg(feature = "json-schema")]
            run_schema_export(output.as_deref());
            #[cfg(not(feature = "json-schema"))]
            {
                let _ = output;
                eprintln!("Error: JSON schema export requires the 'json-schema' feature");
                std::process::exit(1);
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> ScimPatchConfig {
    let config = match path {
        Some(path) => match ScimPatchConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config from {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ScimPatchConfig::default(),
    };

    if let Err(e) = observability::init_tracing(&config.observability.logging) {
        eprintln!("{}", e);
    }
    config
}

fn run_apply(
    config: &ScimPatchConfig,
    resource_type: &str,
    resource: &Path,
    patch: &Path,
    output: Option<&Path>,
) {
    let registry = match config.schemas.build_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to load schemas: {}", e);
            std::process::exit(1);
        }
    };
    let Some(resource_type) = registry.resource_type(resource_type) else {
        fail(&ScimErrorResponse::not_found(format!(
            "Resource type '{}' is not registered",
            resource_type
        )));
    };

    let resource: Value = read_json(resource);
    let request: PatchRequest = read_json(patch);

    let engine = PatchEngine::new(resource_type, &config.patch);
    match engine.apply(&resource, &request) {
        Ok(outcome) => {
            tracing::info!(
                changed = outcome.changed,
                attributes = ?outcome.changed_attributes,
                "Patch applied"
            );
            write_json(output, &outcome.resource);
        }
        Err(e) => {
            tracing::debug!(error = %e, "Patch rejected");
            fail(&ScimErrorResponse::from(&e));
        }
    }
}

fn run_resource_types(config: &ScimPatchConfig) {
    let registry = match config.schemas.build_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to load schemas: {}", e);
            std::process::exit(1);
        }
    };
    for resource_type in registry.resource_types() {
        let extensions: Vec<&str> = resource_type
            .extensions()
            .iter()
            .map(|schema| schema.id.as_str())
            .collect();
        println!(
            "{}\t{}\t{}",
            resource_type.name,
            resource_type.main_schema().id,
            extensions.join(",")
        );
    }
}

/// Export the config JSON schema to file or stdout
#[cfg(feature = "json-schema")]
fn run_schema_export(output: Option<&Path>) {
    let content = match ScimPatchConfig::json_schema_string() {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to serialize config schema: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &content) {
                eprintln!("Failed to write to {}: {}", path.display(), e);
                std::process::exit(1);
            }
            eprintln!("Config JSON schema written to {}", path.display());
        }
        None => println!("{}", content),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    let mut contents = String::new();
    let read = if path == Path::new("-") {
        std::io::stdin().read_to_string(&mut contents).map(|_| ())
    } else {
        std::fs::read_to_string(path).map(|c| contents = c)
    };
    if let Err(e) = read {
        eprintln!("Failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    }

    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => fail(&ScimErrorResponse::invalid_syntax(format!(
            "{}: {}",
            path.display(),
            e
        ))),
    }
}

fn write_json(output: Option<&Path>, value: &impl Serialize) {
    let content = match serde_json::to_string_pretty(value) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to serialize output: {}", e);
            std::process::exit(1);
        }
    };
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, content) {
                eprintln!("Failed to write to {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => println!("{}", content),
    }
}

/// Print a SCIM error document and exit non-zero.
fn fail(error: &ScimErrorResponse) -> ! {
    write_json(None, error);
    std::process::exit(1);
}
