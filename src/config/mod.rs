//! Configuration module for the SCIM PATCH engine.
//!
//! Configuration is read from a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. Every section is
//! optional.
//!
//! # Example
//!
//! ```toml
//! [patch]
//! ignore_unknown_attribute = false
//!
//! [patch.workarounds]
//! ms_azure = true
//!
//! [schemas]
//! directory = "${SCIM_SCHEMA_DIR}"
//! include_core = true
//!
//! [observability.logging]
//! level = "debug"
//! format = "json"
//! ```

mod observability;
mod patch;
mod schemas;

use std::path::Path;

use once_cell::sync::Lazy;
pub use observability::*;
pub use patch::*;
use regex::Regex;
pub use schemas::*;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct ScimPatchConfig {
    /// PATCH engine behaviour.
    #[serde(default)]
    pub patch: PatchConfig,

    /// Schema and resource type sources.
    #[serde(default)]
    pub schemas: SchemasConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ScimPatchConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: ScimPatchConfig = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.schemas.include_core && self.schemas.directory.is_none() {
            return Err(ConfigError::Validation(
                "schemas.include_core is disabled and no schemas.directory is configured; \
                 no resource types would be available"
                    .into(),
            ));
        }
        if let Some(directory) = &self.schemas.directory
            && directory.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation(
                "schemas.directory must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Generate the JSON schema for the configuration file.
    #[cfg(feature = "json-schema")]
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ScimPatchConfig)
    }

    /// Generate the JSON schema as a pretty-printed JSON string.
    #[cfg(feature = "json-schema")]
    pub fn json_schema_string() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::json_schema())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

static ENV_VAR: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}"));

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left alone.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = ENV_VAR
        .as_ref()
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };
            if comment_pos.is_some_and(|pos| whole.start() >= pos) {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);
            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ScimPatchConfig::from_str("").unwrap();
        assert!(!config.patch.ignore_unknown_attribute);
        assert!(!config.patch.workarounds.ms_azure);
        assert!(config.schemas.include_core);
        assert!(config.schemas.directory.is_none());
        assert_eq!(config.observability.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_full_config() {
        let config = ScimPatchConfig::from_str(
            r#"
            [patch]
            ignore_unknown_attribute = true

            [patch.workarounds]
            ms_azure = true

            [schemas]
            directory = "/etc/scim/schemas"
            include_core = false

            [observability.logging]
            level = "trace"
            format = "pretty"
            file_line = true
        "#,
        )
        .unwrap();
        assert!(config.patch.ignore_unknown_attribute);
        assert!(config.patch.workarounds.ms_azure);
        assert_eq!(
            config.schemas.directory.as_deref(),
            Some(Path::new("/etc/scim/schemas"))
        );
        assert_eq!(config.observability.logging.level, LogLevel::Trace);
        assert!(config.observability.logging.file_line);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = ScimPatchConfig::from_str(
            r#"
            [patch]
            ignore_unknown_attributes = true
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_no_schema_source_rejected() {
        let err = ScimPatchConfig::from_str(
            r#"
            [schemas]
            include_core = false
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scim-patch.toml");
        std::fs::write(&path, "[patch.workarounds]\nms_azure = true\n").unwrap();

        let config = ScimPatchConfig::from_file(&path).unwrap();
        assert!(config.patch.workarounds.ms_azure);

        let missing = ScimPatchConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_, _))));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("TEST_SCIM_SCHEMA_DIR", Some("/srv/schemas"), || {
            let config = ScimPatchConfig::from_str(
                r#"
                [schemas]
                directory = "${TEST_SCIM_SCHEMA_DIR}"
            "#,
            )
            .unwrap();
            assert_eq!(
                config.schemas.directory.as_deref(),
                Some(Path::new("/srv/schemas"))
            );
        });
    }

    #[test]
    fn test_missing_env_var() {
        temp_env::with_var_unset("TEST_SCIM_UNSET_VAR", || {
            let err = expand_env_vars("directory = \"${TEST_SCIM_UNSET_VAR}\"").unwrap_err();
            assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "TEST_SCIM_UNSET_VAR"));
        });
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        let result = expand_env_vars("# directory = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# directory = \"${NONEXISTENT_VAR}\"");
    }

    #[test]
    fn test_env_var_before_comment_expanded() {
        temp_env::with_var("TEST_SCIM_BEFORE_COMMENT", Some("expanded"), || {
            let result =
                expand_env_vars("key = \"${TEST_SCIM_BEFORE_COMMENT}\" # ${NONEXISTENT}").unwrap();
            assert_eq!(result, "key = \"expanded\" # ${NONEXISTENT}");
        });
    }

    #[test]
    fn test_multiline_with_comments() {
        temp_env::with_var("TEST_SCIM_MULTI", Some("value1"), || {
            let input = "key1 = \"${TEST_SCIM_MULTI}\"\n# key2 = \"${NONEXISTENT}\"\nkey3 = \"literal\"\n";
            let result = expand_env_vars(input).unwrap();
            assert_eq!(
                result,
                "key1 = \"value1\"\n# key2 = \"${NONEXISTENT}\"\nkey3 = \"literal\"\n"
            );
        });
    }
}
