use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::scim::{SchemaError, SchemaRegistry};

/// Where schema and resource type definitions come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct SchemasConfig {
    /// Directory of `*.json` schema and resource type documents.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Register the RFC 7643 User, Group and Enterprise User definitions.
    #[serde(default = "default_true")]
    pub include_core: bool,
}

impl Default for SchemasConfig {
    fn default() -> Self {
        Self {
            directory: None,
            include_core: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl SchemasConfig {
    /// Build a registry from the core definitions and the configured directory.
    pub fn build_registry(&self) -> Result<SchemaRegistry, SchemaError> {
        let mut registry = if self.include_core {
            SchemaRegistry::with_core_schemas()?
        } else {
            SchemaRegistry::new()
        };
        if let Some(directory) = &self.directory {
            registry.load_dir(directory)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_registry_by_default() {
        let registry = SchemasConfig::default().build_registry().unwrap();
        assert!(registry.resource_type("User").is_some());
        assert!(registry.resource_type("Group").is_some());
    }

    #[test]
    fn test_empty_registry_without_core() {
        let config = SchemasConfig {
            directory: None,
            include_core: false,
        };
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.resource_types().count(), 0);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let config = SchemasConfig {
            directory: Some(PathBuf::from("/nonexistent/scim-schemas")),
            include_core: true,
        };
        assert!(matches!(
            config.build_registry(),
            Err(SchemaError::Io(_, _))
        ));
    }
}
