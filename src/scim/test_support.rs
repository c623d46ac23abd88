//! Shared fixtures: an `AllTypes` resource type covering every attribute shape.

use std::sync::Arc;

use serde_json::json;

use super::schema::{ResourceType, ResourceTypeDefinition, SchemaDefinition};

pub const ALL_TYPES: &str = "urn:gold:params:scim:schemas:custom:2.0:AllTypes";
pub const ENTERPRISE: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

fn scalar_attributes() -> serde_json::Value {
    json!([
        {"name": "string", "type": "string"},
        {"name": "number", "type": "integer"},
        {"name": "decimal", "type": "decimal"},
        {"name": "bool", "type": "boolean"},
        {"name": "date", "type": "dateTime"},
        {"name": "binary", "type": "binary"},
        {"name": "stringArray", "type": "string", "multiValued": true},
        {"name": "numberArray", "type": "integer", "multiValued": true},
        {"name": "decimalArray", "type": "decimal", "multiValued": true},
        {"name": "boolArray", "type": "boolean", "multiValued": true},
        {"name": "dateArray", "type": "dateTime", "multiValued": true}
    ])
}

pub fn all_types_schema() -> SchemaDefinition {
    let mut multi_subs = scalar_attributes().as_array().cloned().unwrap_or_default();
    multi_subs.push(json!({"name": "primary", "type": "boolean"}));
    multi_subs.push(json!({"name": "caseExactString", "type": "string", "caseExact": true}));

    let mut attributes = scalar_attributes().as_array().cloned().unwrap_or_default();
    attributes.extend([
        json!({"name": "reference", "type": "reference", "referenceTypes": ["external"]}),
        json!({"name": "caseExactString", "type": "string", "caseExact": true}),
        json!({"name": "requiredString", "type": "string", "required": true}),
        json!({"name": "immutableString", "type": "string", "mutability": "immutable"}),
        json!({"name": "readOnlyString", "type": "string", "mutability": "readOnly"}),
        json!({"name": "complex", "type": "complex", "subAttributes": scalar_attributes()}),
        json!({
            "name": "multiComplex",
            "type": "complex",
            "multiValued": true,
            "subAttributes": multi_subs
        }),
        json!({
            "name": "members",
            "type": "complex",
            "multiValued": true,
            "subAttributes": [
                {"name": "value", "type": "string", "required": true},
                {"name": "display", "type": "string"},
                {"name": "type", "type": "string"}
            ]
        }),
    ]);

    serde_json::from_value(json!({
        "id": ALL_TYPES,
        "name": "AllTypes",
        "attributes": attributes
    }))
    .unwrap()
}

pub fn enterprise_schema() -> SchemaDefinition {
    serde_json::from_value(json!({
        "id": ENTERPRISE,
        "name": "EnterpriseUser",
        "attributes": [
            {"name": "employeeNumber", "type": "string"},
            {"name": "costCenter", "type": "string"},
            {"name": "manager", "type": "complex", "subAttributes": [
                {"name": "value", "type": "string"},
                {"name": "displayName", "type": "string", "mutability": "readOnly"}
            ]}
        ]
    }))
    .unwrap()
}

/// `AllTypes` with the Enterprise User extension.
pub fn all_types() -> Arc<ResourceType> {
    let main = all_types_schema();
    let extension = enterprise_schema();

    let definition: ResourceTypeDefinition = serde_json::from_value(json!({
        "name": "AllTypes",
        "endpoint": "/AllTypes",
        "schema": ALL_TYPES,
        "schemaExtensions": [{"schema": ENTERPRISE, "required": false}]
    }))
    .unwrap();

    Arc::new(
        ResourceType::build(&definition, |uri| match uri {
            ALL_TYPES => Some(&main),
            ENTERPRISE => Some(&extension),
            _ => None,
        })
        .unwrap(),
    )
}
