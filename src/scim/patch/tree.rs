//! Navigation and mutation helpers for the resource tree.
//!
//! Attribute keys are matched case-insensitively; writes keep the spelling
//! already present in the resource, or use the schema's spelling for new keys.
//! Extension content lives under the extension URI at the resource root.

use serde_json::{Map, Value};

use super::PatchError;
use crate::scim::{
    schema::{AttrId, ResourceType},
    types::SCHEMAS_KEY,
};

pub(crate) type Object = Map<String, Value>;

/// The key in `map` matching `name` case-insensitively.
pub(crate) fn find_key(map: &Object, name: &str) -> Option<String> {
    if map.contains_key(name) {
        return Some(name.to_string());
    }
    map.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
}

pub(crate) fn get<'a>(map: &'a Object, name: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

pub(crate) fn get_mut<'a>(map: &'a mut Object, name: &str) -> Option<&'a mut Value> {
    let key = find_key(map, name)?;
    map.get_mut(&key)
}

/// Store `value` under `name`. Returns whether the content changed.
pub(crate) fn set(map: &mut Object, name: &str, value: Value) -> bool {
    match get_mut(map, name) {
        Some(existing) => {
            let changed = *existing != value;
            *existing = value;
            changed
        }
        None => {
            map.insert(name.to_string(), value);
            true
        }
    }
}

/// Remove `name`, keeping the order of the remaining keys.
pub(crate) fn remove(map: &mut Object, name: &str) -> Option<Value> {
    let key = find_key(map, name)?;
    map.shift_remove(&key)
}

/// The object holding top-level attribute `top`: the resource root for the
/// main schema, or the extension object (created on demand).
pub(crate) fn schema_container<'a>(
    root: &'a mut Object,
    resource_type: &ResourceType,
    top: AttrId,
    create: bool,
) -> Result<Option<&'a mut Object>, PatchError> {
    let Some(uri) = resource_type.container_uri(top) else {
        return Ok(Some(root));
    };

    let key = match find_key(root, uri) {
        Some(key) => key,
        None if create => {
            add_schema_uri(root, uri);
            root.insert(uri.to_string(), Value::Object(Map::new()));
            uri.to_string()
        }
        None => return Ok(None),
    };

    object_at(root, &key, create, uri)
}

/// The object directly holding `attribute`: its schema container, or the
/// single-valued complex attribute it belongs to.
pub(crate) fn attribute_container<'a>(
    root: &'a mut Object,
    resource_type: &ResourceType,
    attribute: AttrId,
    create: bool,
) -> Result<Option<&'a mut Object>, PatchError> {
    let Some(parent) = resource_type.attribute(attribute).parent() else {
        return schema_container(root, resource_type, attribute, create);
    };
    let Some(container) = schema_container(root, resource_type, parent, create)? else {
        return Ok(None);
    };

    let parent_definition = resource_type.attribute(parent);
    let key = match find_key(container, &parent_definition.name) {
        Some(key) => key,
        None if create => {
            container.insert(parent_definition.name.clone(), Value::Object(Map::new()));
            parent_definition.name.clone()
        }
        None => return Ok(None),
    };

    object_at(container, &key, create, &parent_definition.full_name)
}

fn object_at<'a>(
    map: &'a mut Object,
    key: &str,
    create: bool,
    describe: &str,
) -> Result<Option<&'a mut Object>, PatchError> {
    let Some(value) = map.get_mut(key) else {
        return Ok(None);
    };
    if value.is_null() && create {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(object) => Ok(Some(object)),
        Value::Null => Ok(None),
        other => Err(PatchError::MalformedResource(format!(
            "Expected '{}' to hold a JSON object but found {}",
            describe,
            super::validate::actual_type(other)
        ))),
    }
}

/// Drop the single-valued complex parent of `attribute` and its extension
/// object once they hold nothing.
pub(crate) fn prune(root: &mut Object, resource_type: &ResourceType, attribute: AttrId) {
    let definition = resource_type.attribute(attribute);
    let top = definition.parent().unwrap_or(attribute);

    if let Some(parent) = definition.parent()
        && !resource_type.attribute(parent).multi_valued
        && let Ok(Some(container)) = schema_container(root, resource_type, parent, false)
    {
        let name = &resource_type.attribute(parent).name;
        if get(container, name).is_some_and(is_empty_object) {
            remove(container, name);
        }
    }

    if let Some(uri) = resource_type.container_uri(top)
        && get(root, uri).is_some_and(is_empty_object)
    {
        remove(root, uri);
        remove_schema_uri(root, uri);
    }
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

/// Add `uri` to the resource's `schemas` array, if it has one.
pub(crate) fn add_schema_uri(root: &mut Object, uri: &str) {
    if let Some(Value::Array(schemas)) = get_mut(root, SCHEMAS_KEY)
        && !schemas
            .iter()
            .any(|s| s.as_str().is_some_and(|s| s.eq_ignore_ascii_case(uri)))
    {
        schemas.push(Value::String(uri.to_string()));
    }
}

pub(crate) fn remove_schema_uri(root: &mut Object, uri: &str) {
    if let Some(Value::Array(schemas)) = get_mut(root, SCHEMAS_KEY) {
        schemas.retain(|s| !s.as_str().is_some_and(|s| s.eq_ignore_ascii_case(uri)));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scim::{
        schema::SchemaRef,
        test_support::{ENTERPRISE, all_types},
    };

    fn object(value: Value) -> Object {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_set_keeps_existing_spelling() {
        let mut map = object(json!({"DisplayName": "a"}));
        assert!(set(&mut map, "displayName", json!("b")));
        assert!(!set(&mut map, "displayname", json!("b")));
        assert_eq!(Value::Object(map), json!({"DisplayName": "b"}));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut map = object(json!({"a": 1, "b": 2, "c": 3}));
        assert_eq!(remove(&mut map, "A"), Some(json!(1)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_extension_container_created_and_pruned() {
        let rt = all_types();
        let manager = rt.find_attribute(SchemaRef::Extension(0), "manager").unwrap();
        let value = rt.find_sub_attribute(manager, "value").unwrap();
        let mut root = object(json!({"schemas": ["urn:gold:params:scim:schemas:custom:2.0:AllTypes"]}));

        let container = attribute_container(&mut root, &rt, value, true)
            .unwrap()
            .unwrap();
        set(container, "value", json!("boss"));
        assert_eq!(root[ENTERPRISE], json!({"manager": {"value": "boss"}}));
        assert_eq!(root["schemas"].as_array().unwrap().len(), 2);

        let container = attribute_container(&mut root, &rt, value, false)
            .unwrap()
            .unwrap();
        remove(container, "value");
        prune(&mut root, &rt, value);
        assert!(root.get(ENTERPRISE).is_none());
        assert_eq!(root["schemas"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_container_rejects_non_object() {
        let rt = all_types();
        let complex = rt.find_attribute(SchemaRef::Main, "complex").unwrap();
        let string = rt.find_sub_attribute(complex, "string").unwrap();
        let mut root = object(json!({"complex": "oops"}));

        assert!(matches!(
            attribute_container(&mut root, &rt, string, true),
            Err(PatchError::MalformedResource(_))
        ));
    }

    #[test]
    fn test_missing_container_without_create() {
        let rt = all_types();
        let complex = rt.find_attribute(SchemaRef::Main, "complex").unwrap();
        let string = rt.find_sub_attribute(complex, "string").unwrap();
        let mut root = Object::new();

        assert!(attribute_container(&mut root, &rt, string, false)
            .unwrap()
            .is_none());
        assert!(root.is_empty());
    }
}
