//! SCIM 2.0 Schema Definitions
//!
//! Schema documents (RFC 7643 Section 7) deserialize into [`SchemaDefinition`].
//! A [`ResourceType`] flattens its main schema and extension schemas into an
//! arena of [`SchemaAttribute`]s addressed by [`AttrId`]; parent links between
//! sub-attributes and their complex attribute are arena indices.
//!
//! Resource types are immutable once built and are shared behind `Arc`.

mod registry;
mod resolver;

use std::{fmt, path::PathBuf};

pub use registry::SchemaRegistry;
pub use resolver::{ResolveError, Resolved, ResolvedAttribute};
use serde::{Deserialize, Serialize};

// =============================================================================
// Schema Documents
// =============================================================================

/// Attribute data types per RFC 7643 Section 2.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    String,
    Boolean,
    Decimal,
    Integer,
    DateTime,
    Binary,
    Reference,
    Complex,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
            AttributeType::Decimal => "decimal",
            AttributeType::Integer => "integer",
            AttributeType::DateTime => "dateTime",
            AttributeType::Binary => "binary",
            AttributeType::Reference => "reference",
            AttributeType::Complex => "complex",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    #[default]
    ReadWrite,
    Immutable,
    WriteOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    Always,
    Never,
    #[default]
    Default,
    Request,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    #[default]
    None,
    Server,
    Global,
}

/// One attribute of a schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub attr_type: AttributeType,

    #[serde(default)]
    pub multi_valued: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub case_exact: bool,

    #[serde(default)]
    pub mutability: Mutability,

    #[serde(default)]
    pub returned: Returned,

    #[serde(default)]
    pub uniqueness: Uniqueness,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub canonical_values: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_types: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<AttributeDefinition>,
}

impl AttributeDefinition {
    /// A single-valued, optional, read-write attribute.
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            multi_valued: false,
            description: None,
            required: false,
            case_exact: false,
            mutability: Mutability::default(),
            returned: Returned::default(),
            uniqueness: Uniqueness::default(),
            canonical_values: Vec::new(),
            reference_types: Vec::new(),
            sub_attributes: Vec::new(),
        }
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn case_exact(mut self) -> Self {
        self.case_exact = true;
        self
    }

    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn with_sub_attributes(mut self, sub_attributes: Vec<AttributeDefinition>) -> Self {
        self.sub_attributes = sub_attributes;
        self
    }
}

/// A schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

/// A resource type document (RFC 7643 Section 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Main schema URI
    pub schema: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_extensions: Vec<SchemaExtensionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaExtensionDefinition {
    pub schema: String,
    #[serde(default)]
    pub required: bool,
}

/// Schema loading and building errors.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Resource type '{resource_type}' references unknown schema '{schema}'")]
    UnknownSchema {
        resource_type: String,
        schema: String,
    },

    #[error("Complex attribute '{0}' may not contain complex sub-attributes")]
    NestedComplex(String),

    #[error("Attribute '{0}' is defined more than once")]
    DuplicateAttribute(String),

    #[error("Failed to read schema file {1}: {0}")]
    Io(std::io::Error, PathBuf),

    #[error("Failed to parse schema file {1}: {0}")]
    Parse(serde_json::Error, PathBuf),

    #[error("File {0} is neither a schema nor a resource type document")]
    UnrecognizedDocument(PathBuf),

    #[error("Built-in schema '{0}' is malformed: {1}")]
    BuiltIn(&'static str, serde_json::Error),
}

// =============================================================================
// Resolved Schema Model
// =============================================================================

/// Index of an attribute in a [`ResourceType`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrId(usize);

/// Which schema of a resource type an attribute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRef {
    Main,
    Extension(usize),
}

/// A resolved attribute definition.
#[derive(Debug, Clone)]
pub struct SchemaAttribute {
    pub name: String,
    /// `schemaURI:attribute` or `schemaURI:attribute.subAttribute`
    pub full_name: String,
    pub attr_type: AttributeType,
    pub multi_valued: bool,
    pub required: bool,
    pub case_exact: bool,
    pub mutability: Mutability,
    pub returned: Returned,
    pub uniqueness: Uniqueness,
    pub canonical_values: Vec<String>,
    pub reference_types: Vec<String>,
    pub schema: SchemaRef,
    sub_attributes: Vec<AttrId>,
    parent: Option<AttrId>,
}

impl SchemaAttribute {
    pub fn is_complex(&self) -> bool {
        self.attr_type == AttributeType::Complex
    }

    pub fn is_multi_valued_complex(&self) -> bool {
        self.is_complex() && self.multi_valued
    }

    pub fn parent(&self) -> Option<AttrId> {
        self.parent
    }

    pub fn sub_attributes(&self) -> &[AttrId] {
        &self.sub_attributes
    }

    pub fn is_read_only(&self) -> bool {
        self.mutability == Mutability::ReadOnly
    }
}

/// A schema as seen by one resource type.
#[derive(Debug, Clone)]
pub struct Schema {
    pub id: String,
    pub name: Option<String>,
    /// Whether a resource must carry this extension (always false for the main schema)
    pub required: bool,
    attributes: Vec<AttrId>,
}

impl Schema {
    pub fn attributes(&self) -> &[AttrId] {
        &self.attributes
    }
}

/// A resource type with its main and extension schemas resolved.
#[derive(Debug, Clone)]
pub struct ResourceType {
    pub name: String,
    pub endpoint: Option<String>,
    main: Schema,
    extensions: Vec<Schema>,
    arena: Vec<SchemaAttribute>,
}

impl ResourceType {
    /// Build a resource type, looking schema URIs up with `lookup`.
    ///
    /// The common attributes `id`, `externalId` and `meta` are added to the
    /// main schema unless it defines them itself.
    pub fn build<'a>(
        definition: &ResourceTypeDefinition,
        lookup: impl Fn(&str) -> Option<&'a SchemaDefinition>,
    ) -> Result<Self, SchemaError> {
        let unknown = |schema: &str| SchemaError::UnknownSchema {
            resource_type: definition.name.clone(),
            schema: schema.to_string(),
        };

        let mut builder = ArenaBuilder::default();

        let main_def = lookup(&definition.schema).ok_or_else(|| unknown(&definition.schema))?;
        let mut main_attributes = main_def.attributes.clone();
        for common in common_attributes() {
            if !main_attributes
                .iter()
                .any(|a| a.name.eq_ignore_ascii_case(&common.name))
            {
                main_attributes.push(common);
            }
        }
        let main = builder.schema(main_def, &main_attributes, SchemaRef::Main, false)?;

        let mut extensions = Vec::with_capacity(definition.schema_extensions.len());
        for (index, extension) in definition.schema_extensions.iter().enumerate() {
            let def = lookup(&extension.schema).ok_or_else(|| unknown(&extension.schema))?;
            extensions.push(builder.schema(
                def,
                &def.attributes,
                SchemaRef::Extension(index),
                extension.required,
            )?);
        }

        Ok(Self {
            name: definition.name.clone(),
            endpoint: definition.endpoint.clone(),
            main,
            extensions,
            arena: builder.arena,
        })
    }

    pub fn attribute(&self, id: AttrId) -> &SchemaAttribute {
        &self.arena[id.0]
    }

    pub fn main_schema(&self) -> &Schema {
        &self.main
    }

    pub fn extensions(&self) -> &[Schema] {
        &self.extensions
    }

    pub fn schema_of(&self, schema: SchemaRef) -> &Schema {
        match schema {
            SchemaRef::Main => &self.main,
            SchemaRef::Extension(index) => &self.extensions[index],
        }
    }

    /// Look a schema up by URI, case-insensitively.
    pub fn schema_by_uri(&self, uri: &str) -> Option<(SchemaRef, &Schema)> {
        if self.main.id.eq_ignore_ascii_case(uri) {
            return Some((SchemaRef::Main, &self.main));
        }
        self.extension_by_uri(uri)
            .map(|index| (SchemaRef::Extension(index), &self.extensions[index]))
    }

    /// Index of the extension schema with this URI, case-insensitively.
    pub fn extension_by_uri(&self, uri: &str) -> Option<usize> {
        self.extensions
            .iter()
            .position(|s| s.id.eq_ignore_ascii_case(uri))
    }

    /// Find a top-level attribute of `schema` by name, case-insensitively.
    pub fn find_attribute(&self, schema: SchemaRef, name: &str) -> Option<AttrId> {
        self.schema_of(schema)
            .attributes
            .iter()
            .copied()
            .find(|id| self.attribute(*id).name.eq_ignore_ascii_case(name))
    }

    /// Find a sub-attribute of a complex attribute by name, case-insensitively.
    pub fn find_sub_attribute(&self, parent: AttrId, name: &str) -> Option<AttrId> {
        self.attribute(parent)
            .sub_attributes
            .iter()
            .copied()
            .find(|id| self.attribute(*id).name.eq_ignore_ascii_case(name))
    }

    /// The object key that holds `attribute`'s schema content, or `None` for
    /// the main schema (whose attributes live at the resource root).
    pub fn container_uri(&self, attribute: AttrId) -> Option<&str> {
        match self.attribute(attribute).schema {
            SchemaRef::Main => None,
            SchemaRef::Extension(index) => Some(self.extensions[index].id.as_str()),
        }
    }
}

#[derive(Default)]
struct ArenaBuilder {
    arena: Vec<SchemaAttribute>,
}

impl ArenaBuilder {
    fn schema(
        &mut self,
        definition: &SchemaDefinition,
        attributes: &[AttributeDefinition],
        schema: SchemaRef,
        required: bool,
    ) -> Result<Schema, SchemaError> {
        let mut ids = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            let full_name = format!("{}:{}", definition.id, attribute.name);
            ensure_unique(&ids, &self.arena, &attribute.name, &full_name)?;
            ids.push(self.attribute(attribute, full_name, schema, None)?);
        }

        Ok(Schema {
            id: definition.id.clone(),
            name: definition.name.clone(),
            required,
            attributes: ids,
        })
    }

    fn attribute(
        &mut self,
        definition: &AttributeDefinition,
        full_name: String,
        schema: SchemaRef,
        parent: Option<AttrId>,
    ) -> Result<AttrId, SchemaError> {
        let id = AttrId(self.arena.len());
        self.arena.push(SchemaAttribute {
            name: definition.name.clone(),
            full_name: full_name.clone(),
            attr_type: definition.attr_type,
            multi_valued: definition.multi_valued,
            required: definition.required,
            case_exact: definition.case_exact,
            mutability: definition.mutability,
            returned: definition.returned,
            uniqueness: definition.uniqueness,
            canonical_values: definition.canonical_values.clone(),
            reference_types: definition.reference_types.clone(),
            schema,
            sub_attributes: Vec::new(),
            parent,
        });

        let mut sub_ids = Vec::with_capacity(definition.sub_attributes.len());
        for sub in &definition.sub_attributes {
            if parent.is_some() || sub.attr_type == AttributeType::Complex {
                return Err(SchemaError::NestedComplex(full_name));
            }
            let sub_full_name = format!("{}.{}", full_name, sub.name);
            ensure_unique(&sub_ids, &self.arena, &sub.name, &sub_full_name)?;
            sub_ids.push(self.attribute(sub, sub_full_name, schema, Some(id))?);
        }
        self.arena[id.0].sub_attributes = sub_ids;

        Ok(id)
    }
}

fn ensure_unique(
    siblings: &[AttrId],
    arena: &[SchemaAttribute],
    name: &str,
    full_name: &str,
) -> Result<(), SchemaError> {
    if siblings
        .iter()
        .any(|id| arena[id.0].name.eq_ignore_ascii_case(name))
    {
        return Err(SchemaError::DuplicateAttribute(full_name.to_string()));
    }
    Ok(())
}

/// Common attributes every resource carries (RFC 7643 Section 3.1).
fn common_attributes() -> Vec<AttributeDefinition> {
    use AttributeType::{Complex, DateTime, Reference, String};

    vec![
        AttributeDefinition::new("id", String)
            .case_exact()
            .with_mutability(Mutability::ReadOnly),
        AttributeDefinition::new("externalId", String).case_exact(),
        AttributeDefinition::new("meta", Complex)
            .with_mutability(Mutability::ReadOnly)
            .with_sub_attributes(vec![
                AttributeDefinition::new("resourceType", String)
                    .case_exact()
                    .with_mutability(Mutability::ReadOnly),
                AttributeDefinition::new("created", DateTime).with_mutability(Mutability::ReadOnly),
                AttributeDefinition::new("lastModified", DateTime)
                    .with_mutability(Mutability::ReadOnly),
                AttributeDefinition::new("location", Reference)
                    .case_exact()
                    .with_mutability(Mutability::ReadOnly),
                AttributeDefinition::new("version", String)
                    .case_exact()
                    .with_mutability(Mutability::ReadOnly),
            ]),
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn definition(value: serde_json::Value) -> SchemaDefinition {
        serde_json::from_value(value).unwrap()
    }

    fn resource_type_def(schema: &str, extensions: &[&str]) -> ResourceTypeDefinition {
        ResourceTypeDefinition {
            id: None,
            name: "Thing".to_string(),
            endpoint: Some("/Things".to_string()),
            description: None,
            schema: schema.to_string(),
            schema_extensions: extensions
                .iter()
                .map(|s| SchemaExtensionDefinition {
                    schema: s.to_string(),
                    required: false,
                })
                .collect(),
        }
    }

    #[test]
    fn test_deserialize_attribute_definition_defaults() {
        let def: AttributeDefinition = serde_json::from_value(json!({
            "name": "lastLogin",
            "type": "dateTime"
        }))
        .unwrap();

        assert_eq!(def.attr_type, AttributeType::DateTime);
        assert!(!def.multi_valued);
        assert!(!def.required);
        assert_eq!(def.mutability, Mutability::ReadWrite);
        assert_eq!(def.returned, Returned::Default);
        assert_eq!(def.uniqueness, Uniqueness::None);
    }

    #[test]
    fn test_build_assigns_full_names_and_parents() {
        let main = definition(json!({
            "id": "urn:test:Thing",
            "attributes": [
                {"name": "name", "type": "complex", "subAttributes": [
                    {"name": "givenName", "type": "string"}
                ]}
            ]
        }));
        let rt = ResourceType::build(&resource_type_def("urn:test:Thing", &[]), |uri| {
            (uri == "urn:test:Thing").then_some(&main)
        })
        .unwrap();

        let name = rt.find_attribute(SchemaRef::Main, "NAME").unwrap();
        let given = rt.find_sub_attribute(name, "givenname").unwrap();
        assert_eq!(rt.attribute(given).full_name, "urn:test:Thing:name.givenName");
        assert_eq!(rt.attribute(given).parent(), Some(name));
        assert_eq!(rt.attribute(name).sub_attributes(), &[given]);
    }

    #[test]
    fn test_build_adds_common_attributes() {
        let main = definition(json!({"id": "urn:test:Thing", "attributes": []}));
        let rt = ResourceType::build(&resource_type_def("urn:test:Thing", &[]), |_| Some(&main))
            .unwrap();

        let id = rt.find_attribute(SchemaRef::Main, "id").unwrap();
        assert!(rt.attribute(id).is_read_only());
        let external = rt.find_attribute(SchemaRef::Main, "externalId").unwrap();
        assert_eq!(rt.attribute(external).mutability, Mutability::ReadWrite);
        assert!(rt.find_attribute(SchemaRef::Main, "meta").is_some());
    }

    #[test]
    fn test_build_rejects_nested_complex() {
        let main = definition(json!({
            "id": "urn:test:Thing",
            "attributes": [
                {"name": "outer", "type": "complex", "subAttributes": [
                    {"name": "inner", "type": "complex"}
                ]}
            ]
        }));
        let err = ResourceType::build(&resource_type_def("urn:test:Thing", &[]), |_| Some(&main))
            .unwrap_err();
        assert!(matches!(err, SchemaError::NestedComplex(name) if name == "urn:test:Thing:outer"));
    }

    #[test]
    fn test_build_rejects_duplicate_attribute() {
        let main = definition(json!({
            "id": "urn:test:Thing",
            "attributes": [
                {"name": "title", "type": "string"},
                {"name": "Title", "type": "string"}
            ]
        }));
        let err = ResourceType::build(&resource_type_def("urn:test:Thing", &[]), |_| Some(&main))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateAttribute(_)));
    }

    #[test]
    fn test_build_rejects_unknown_extension() {
        let main = definition(json!({"id": "urn:test:Thing", "attributes": []}));
        let err = ResourceType::build(
            &resource_type_def("urn:test:Thing", &["urn:test:Missing"]),
            |uri| (uri == "urn:test:Thing").then_some(&main),
        )
        .unwrap_err();
        assert!(err.to_string().contains("urn:test:Missing"));
    }

    #[test]
    fn test_extension_attributes_know_their_container() {
        let main = definition(json!({"id": "urn:test:Thing", "attributes": []}));
        let ext = definition(json!({
            "id": "urn:test:Ext",
            "attributes": [{"name": "costCenter", "type": "string"}]
        }));
        let rt = ResourceType::build(&resource_type_def("urn:test:Thing", &["urn:test:Ext"]), |uri| {
            match uri {
                "urn:test:Thing" => Some(&main),
                "urn:test:Ext" => Some(&ext),
                _ => None,
            }
        })
        .unwrap();

        let (schema, _) = rt.schema_by_uri("URN:TEST:EXT").unwrap();
        let cost = rt.find_attribute(schema, "costcenter").unwrap();
        assert_eq!(rt.container_uri(cost), Some("urn:test:Ext"));
        assert_eq!(rt.attribute(cost).full_name, "urn:test:Ext:costCenter");
    }
}
