//! Schema registry: schema documents and the resource types built from them.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;
use serde_json::Value;

use super::{ResourceType, ResourceTypeDefinition, SchemaDefinition, SchemaError};

const CORE_USER: &str = include_str!("../schemas/user.json");
const CORE_GROUP: &str = include_str!("../schemas/group.json");
const CORE_ENTERPRISE_USER: &str = include_str!("../schemas/enterprise_user.json");
const CORE_RESOURCE_TYPES: &str = include_str!("../schemas/resource_types.json");

/// Registered schemas and resource types, keyed case-insensitively.
///
/// Resource types are rebuilt whenever a schema they depend on is replaced,
/// so register schemas before the resource types that reference them.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, SchemaDefinition>,
    resource_types: IndexMap<String, Arc<ResourceType>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the RFC 7643 User, Group and Enterprise User schemas
    /// with the `User` and `Group` resource types.
    pub fn with_core_schemas() -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for (name, source) in [
            ("user.json", CORE_USER),
            ("group.json", CORE_GROUP),
            ("enterprise_user.json", CORE_ENTERPRISE_USER),
        ] {
            let schema = serde_json::from_str(source).map_err(|e| SchemaError::BuiltIn(name, e))?;
            registry.register_schema(schema);
        }

        let resource_types: Vec<ResourceTypeDefinition> = serde_json::from_str(CORE_RESOURCE_TYPES)
            .map_err(|e| SchemaError::BuiltIn("resource_types.json", e))?;
        for definition in &resource_types {
            registry.register_resource_type(definition)?;
        }

        Ok(registry)
    }

    pub fn register_schema(&mut self, schema: SchemaDefinition) {
        tracing::debug!(schema = %schema.id, "Registered schema");
        self.schemas.insert(schema.id.to_ascii_lowercase(), schema);
    }

    /// Build and register a resource type from its definition.
    pub fn register_resource_type(
        &mut self,
        definition: &ResourceTypeDefinition,
    ) -> Result<Arc<ResourceType>, SchemaError> {
        let resource_type = Arc::new(ResourceType::build(definition, |uri| self.schema(uri))?);
        tracing::debug!(
            resource_type = %resource_type.name,
            extensions = resource_type.extensions().len(),
            "Registered resource type"
        );
        self.resource_types.insert(
            definition.name.to_ascii_lowercase(),
            Arc::clone(&resource_type),
        );
        Ok(resource_type)
    }

    pub fn schema(&self, uri: &str) -> Option<&SchemaDefinition> {
        self.schemas.get(&uri.to_ascii_lowercase())
    }

    pub fn resource_type(&self, name: &str) -> Option<Arc<ResourceType>> {
        self.resource_types.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &Arc<ResourceType>> {
        self.resource_types.values()
    }

    /// Load every `*.json` file in `dir`.
    ///
    /// A document with an `attributes` member is a schema, one with a
    /// `schema` member is a resource type; a file may also hold an array of
    /// documents or a `ListResponse` with `Resources`. Schemas are registered
    /// before any resource type so files may come in any order. Returns the
    /// number of documents loaded.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, SchemaError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| SchemaError::Io(e, dir.to_path_buf()))?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| SchemaError::Io(e, dir.to_path_buf()))?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut resource_types = Vec::new();
        let mut count = 0;
        for path in files {
            let contents = fs::read_to_string(&path).map_err(|e| SchemaError::Io(e, path.clone()))?;
            let document: Value =
                serde_json::from_str(&contents).map_err(|e| SchemaError::Parse(e, path.clone()))?;

            for document in flatten_documents(document) {
                if document.get("attributes").is_some() {
                    let schema = serde_json::from_value(document)
                        .map_err(|e| SchemaError::Parse(e, path.clone()))?;
                    self.register_schema(schema);
                } else if document.get("schema").is_some_and(Value::is_string) {
                    let definition: ResourceTypeDefinition = serde_json::from_value(document)
                        .map_err(|e| SchemaError::Parse(e, path.clone()))?;
                    resource_types.push(definition);
                } else {
                    return Err(SchemaError::UnrecognizedDocument(path));
                }
                count += 1;
            }
        }

        for definition in &resource_types {
            self.register_resource_type(definition)?;
        }

        tracing::info!(directory = %dir.display(), documents = count, "Loaded schema directory");
        Ok(count)
    }
}

fn flatten_documents(document: Value) -> Vec<Value> {
    match document {
        Value::Array(items) => items,
        Value::Object(mut object) if object.contains_key("Resources") => {
            match object.remove("Resources") {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            }
        }
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::scim::{
        schema::{AttributeType, Mutability, SchemaRef},
        types::{SCHEMA_ENTERPRISE_USER, SCHEMA_GROUP, SCHEMA_USER},
    };

    #[test]
    fn test_core_schemas() {
        let registry = SchemaRegistry::with_core_schemas().unwrap();

        let user = registry.resource_type("user").unwrap();
        assert_eq!(user.main_schema().id, SCHEMA_USER);
        assert_eq!(user.extensions().len(), 1);
        assert_eq!(user.extensions()[0].id, SCHEMA_ENTERPRISE_USER);

        let emails = user.find_attribute(SchemaRef::Main, "emails").unwrap();
        assert!(user.attribute(emails).is_multi_valued_complex());

        let group = registry.resource_type("Group").unwrap();
        assert_eq!(group.main_schema().id, SCHEMA_GROUP);
        assert!(group.extensions().is_empty());
        let members = group.find_attribute(SchemaRef::Main, "members").unwrap();
        let value = group.find_sub_attribute(members, "value").unwrap();
        assert_eq!(group.attribute(value).mutability, Mutability::Immutable);
    }

    #[test]
    fn test_core_enterprise_manager_is_complex() {
        let registry = SchemaRegistry::with_core_schemas().unwrap();
        let user = registry.resource_type("User").unwrap();

        let manager = user
            .find_attribute(SchemaRef::Extension(0), "manager")
            .unwrap();
        assert_eq!(user.attribute(manager).attr_type, AttributeType::Complex);
        assert!(!user.attribute(manager).multi_valued);
    }

    #[test]
    fn test_load_dir_any_file_order() {
        let dir = tempfile::tempdir().unwrap();
        // Resource type sorts before the schema it references
        fs::write(
            dir.path().join("a_device_type.json"),
            json!({
                "name": "Device",
                "endpoint": "/Devices",
                "schema": "urn:example:Device"
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            dir.path().join("b_device.json"),
            json!({
                "Resources": [{
                    "id": "urn:example:Device",
                    "attributes": [{"name": "serial", "type": "string", "required": true}]
                }]
            })
            .to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = SchemaRegistry::new();
        assert_eq!(registry.load_dir(dir.path()).unwrap(), 2);

        let device = registry.resource_type("device").unwrap();
        let serial = device.find_attribute(SchemaRef::Main, "serial").unwrap();
        assert!(device.attribute(serial).required);
    }

    #[test]
    fn test_load_dir_rejects_unrecognized_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("odd.json"), r#"{"hello": "world"}"#).unwrap();

        let err = SchemaRegistry::new().load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, SchemaError::UnrecognizedDocument(_)));
    }

    #[test]
    fn test_load_dir_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let err = SchemaRegistry::new().load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_, path) if path.ends_with("broken.json")));
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let err = SchemaRegistry::new()
            .load_dir("/nonexistent/scim/schemas")
            .unwrap_err();
        assert!(matches!(err, SchemaError::Io(_, _)));
    }
}
