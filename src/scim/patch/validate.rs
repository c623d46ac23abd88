//! Type checks of incoming values against attribute definitions.
//!
//! Messages are appended to [`FieldErrors`] under the attribute's full name.
//! For an array value with invalid elements the summary line comes first,
//! followed by one type message per invalid element. A failure inside an
//! element of a multivalued complex attribute also reports the offending
//! elements under the complex attribute's own name.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::DateTime;
use serde_json::{Map, Value};

use super::{FieldErrors, PatchError};
use crate::scim::schema::{AttrId, AttributeType, ResourceType};

/// JSON type name used in messages.
pub(crate) fn actual_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn conforms(attr_type: AttributeType, value: &Value) -> bool {
    match (attr_type, value) {
        (AttributeType::String | AttributeType::Reference, Value::String(_)) => true,
        (AttributeType::Boolean, Value::Bool(_)) => true,
        (AttributeType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (AttributeType::Decimal, Value::Number(_)) => true,
        (AttributeType::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(s).is_ok(),
        (AttributeType::Binary, Value::String(s)) => STANDARD.decode(s).is_ok(),
        (AttributeType::Complex, Value::Object(_)) => true,
        _ => false,
    }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Record that `value` does not have `attribute`'s declared type.
pub(crate) fn type_mismatch(
    resource_type: &ResourceType,
    attribute: AttrId,
    value: &Value,
    errors: &mut FieldErrors,
) {
    let definition = resource_type.attribute(attribute);
    errors.push(
        definition.full_name.clone(),
        format!(
            "Value of attribute '{}' is not of type '{}' but of type '{}' with value '{}'",
            definition.full_name,
            definition.attr_type,
            actual_type(value),
            compact(value)
        ),
    );
}

/// Check a value for a simple attribute, single- or multi-valued.
///
/// A multivalued attribute accepts an array or a lone element.
pub(crate) fn check_value(
    resource_type: &ResourceType,
    attribute: AttrId,
    value: &Value,
    errors: &mut FieldErrors,
) -> bool {
    let definition = resource_type.attribute(attribute);
    if definition.multi_valued
        && let Value::Array(items) = value
    {
        return check_values(resource_type, attribute, items, errors);
    }
    if conforms(definition.attr_type, value) {
        return true;
    }
    if definition.multi_valued {
        return check_values(resource_type, attribute, std::slice::from_ref(value), errors);
    }
    type_mismatch(resource_type, attribute, value, errors);
    false
}

/// Check the elements of a multivalued simple attribute.
pub(crate) fn check_values(
    resource_type: &ResourceType,
    attribute: AttrId,
    values: &[Value],
    errors: &mut FieldErrors,
) -> bool {
    let attr_type = resource_type.attribute(attribute).attr_type;
    let invalid: Vec<&Value> = values
        .iter()
        .filter(|v| !conforms(attr_type, v))
        .collect();
    if invalid.is_empty() {
        return true;
    }

    let listed = Value::Array(invalid.iter().map(|v| (*v).clone()).collect());
    errors.push(
        resource_type.attribute(attribute).full_name.clone(),
        format!(
            "Found unsupported value in multivalued attribute '{}'",
            compact(&listed)
        ),
    );
    for value in invalid {
        type_mismatch(resource_type, attribute, value, errors);
    }
    false
}

/// Check a sub-attribute value destined for elements of a multivalued
/// complex attribute, reporting the would-be element under the parent.
pub(crate) fn check_sub_value(
    resource_type: &ResourceType,
    parent: AttrId,
    attribute: AttrId,
    value: &Value,
    errors: &mut FieldErrors,
) -> bool {
    if check_value(resource_type, attribute, value, errors) {
        return true;
    }
    let mut element = Map::new();
    element.insert(resource_type.attribute(attribute).name.clone(), value.clone());
    offending_elements(resource_type, parent, &[Value::Object(element)], errors);
    false
}

fn offending_elements(
    resource_type: &ResourceType,
    complex: AttrId,
    elements: &[Value],
    errors: &mut FieldErrors,
) {
    errors.push(
        resource_type.attribute(complex).full_name.clone(),
        format!(
            "Found unsupported value in multivalued complex attribute '{}'",
            compact(&Value::Array(elements.to_vec()))
        ),
    );
}

/// How much of an element a caller supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completeness {
    /// New elements: required sub-attributes must be present
    Whole,
    /// Sub-attributes merged into existing elements
    Partial,
}

/// Check and normalize elements for a multivalued complex attribute.
///
/// Keys are rewritten to the schema's spelling, null members are dropped and
/// lone values of multivalued sub-attributes become one-element arrays.
/// Empty elements are dropped unless every supplied element was empty.
/// Returns `Ok(None)` when messages were recorded.
pub(crate) fn check_elements(
    resource_type: &ResourceType,
    complex: AttrId,
    elements: Vec<Value>,
    completeness: Completeness,
    ignore_unknown: bool,
    errors: &mut FieldErrors,
) -> Result<Option<Vec<Map<String, Value>>>, PatchError> {
    let definition = resource_type.attribute(complex);
    let supplied = elements.len();
    let mut valid = Vec::with_capacity(supplied);
    let mut not_objects = Vec::new();
    let mut offending = Vec::new();
    let mut ok = true;

    for element in elements {
        let Value::Object(map) = element else {
            not_objects.push(element);
            continue;
        };

        let mut normalized = Map::new();
        let mut element_ok = true;
        for (key, value) in &map {
            let Some(sub) = resource_type.find_sub_attribute(complex, key) else {
                if ignore_unknown {
                    tracing::warn!(
                        attribute = %definition.full_name,
                        sub_attribute = %key,
                        "Ignoring unknown sub-attribute"
                    );
                    continue;
                }
                return Err(PatchError::UnknownAttribute(format!(
                    "{}.{}",
                    definition.full_name, key
                )));
            };
            if value.is_null() {
                continue;
            }
            let sub_definition = resource_type.attribute(sub);
            let value = match value {
                Value::Array(_) => value.clone(),
                other if sub_definition.multi_valued => Value::Array(vec![other.clone()]),
                other => other.clone(),
            };
            if !check_value(resource_type, sub, &value, errors) {
                element_ok = false;
            }
            normalized.insert(sub_definition.name.clone(), value);
        }

        if !element_ok {
            offending.push(Value::Object(map));
            ok = false;
        } else if !normalized.is_empty() {
            valid.push(normalized);
        }
    }

    if !not_objects.is_empty() {
        check_values(resource_type, complex, &not_objects, errors);
        ok = false;
    }
    if !offending.is_empty() {
        offending_elements(resource_type, complex, &offending, errors);
    }

    let required: Vec<AttrId> = definition
        .sub_attributes()
        .iter()
        .copied()
        .filter(|id| resource_type.attribute(*id).required)
        .collect();

    if completeness == Completeness::Whole {
        for element in &valid {
            for id in &required {
                let sub = resource_type.attribute(*id);
                if !element.contains_key(&sub.name) {
                    errors.push(
                        sub.full_name.clone(),
                        format!("Required sub-attribute '{}' is missing", sub.full_name),
                    );
                    ok = false;
                }
            }
        }
    }

    if ok && supplied > 0 && valid.is_empty() {
        if required.is_empty() {
            errors.push(
                definition.full_name.clone(),
                format!(
                    "Attribute '{}' must contain at least one non-empty element",
                    definition.full_name
                ),
            );
        } else {
            for id in &required {
                let sub = resource_type.attribute(*id);
                errors.push(
                    sub.full_name.clone(),
                    format!("Required sub-attribute '{}' is missing", sub.full_name),
                );
            }
        }
        ok = false;
    }

    Ok(ok.then_some(valid))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::scim::{
        schema::SchemaRef,
        test_support::{ALL_TYPES, all_types},
    };

    fn top(name: &str) -> AttrId {
        all_types().find_attribute(SchemaRef::Main, name).unwrap()
    }

    #[rstest]
    #[case::string("string", json!("x"), true)]
    #[case::string_number("string", json!(1), false)]
    #[case::integer("number", json!(42), true)]
    #[case::integer_decimal("number", json!(4.2), false)]
    #[case::decimal_accepts_integer("decimal", json!(4), true)]
    #[case::boolean("bool", json!(false), true)]
    #[case::boolean_string("bool", json!("true"), false)]
    #[case::date("date", json!("2024-02-29T12:00:00Z"), true)]
    #[case::date_invalid("date", json!("yesterday"), false)]
    #[case::binary("binary", json!("aGVsbG8="), true)]
    #[case::binary_invalid("binary", json!("not base64!"), false)]
    #[case::reference("reference", json!("https://example.com/x"), true)]
    #[case::array_lone_element("numberArray", json!(1), true)]
    #[case::array("numberArray", json!([1, 2]), true)]
    fn test_check_value(#[case] name: &str, #[case] value: Value, #[case] expected: bool) {
        let rt = all_types();
        let mut errors = FieldErrors::new();
        assert_eq!(check_value(&rt, top(name), &value, &mut errors), expected);
        assert_eq!(errors.is_empty(), expected);
    }

    #[test]
    fn test_integer_error_message() {
        let rt = all_types();
        let mut errors = FieldErrors::new();
        check_value(&rt, top("number"), &json!("x"), &mut errors);

        let field = format!("{ALL_TYPES}:number");
        assert_eq!(
            errors.get(&field).unwrap().last().unwrap(),
            &format!(
                "Value of attribute '{field}' is not of type 'integer' but of type 'string' with value '\"x\"'"
            )
        );
    }

    #[test]
    fn test_multivalued_messages_in_order() {
        let rt = all_types();
        let mut errors = FieldErrors::new();
        check_value(&rt, top("numberArray"), &json!([1, "a", true]), &mut errors);

        let field = format!("{ALL_TYPES}:numberArray");
        assert_eq!(
            errors.get(&field).unwrap(),
            [
                r#"Found unsupported value in multivalued attribute '["a",true]'"#.to_string(),
                format!(
                    "Value of attribute '{field}' is not of type 'integer' but of type 'string' with value '\"a\"'"
                ),
                format!(
                    "Value of attribute '{field}' is not of type 'integer' but of type 'boolean' with value 'true'"
                ),
            ]
        );
    }

    #[test]
    fn test_sub_value_reports_parent() {
        let rt = all_types();
        let parent = top("multiComplex");
        let sub = rt.find_sub_attribute(parent, "number").unwrap();
        let mut errors = FieldErrors::new();

        assert!(!check_sub_value(&rt, parent, sub, &json!("x"), &mut errors));
        let fields: Vec<_> = errors.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(
            fields,
            vec![
                format!("{ALL_TYPES}:multiComplex.number"),
                format!("{ALL_TYPES}:multiComplex"),
            ]
        );
        assert_eq!(
            errors.get(&format!("{ALL_TYPES}:multiComplex")).unwrap(),
            [r#"Found unsupported value in multivalued complex attribute '[{"number":"x"}]'"#]
        );
    }

    #[test]
    fn test_check_elements_normalizes() {
        let rt = all_types();
        let mut errors = FieldErrors::new();
        let elements = check_elements(
            &rt,
            top("multiComplex"),
            vec![json!({"NUMBER": 1, "numberArray": 2, "string": null}), json!({})],
            Completeness::Whole,
            false,
            &mut errors,
        )
        .unwrap()
        .unwrap();

        assert!(errors.is_empty());
        assert_eq!(elements.len(), 1);
        assert_eq!(
            Value::Object(elements[0].clone()),
            json!({"number": 1, "numberArray": [2]})
        );
    }

    #[test]
    fn test_check_elements_only_empty_reports_required() {
        let rt = all_types();
        let mut errors = FieldErrors::new();
        let result = check_elements(
            &rt,
            top("members"),
            vec![json!({})],
            Completeness::Whole,
            false,
            &mut errors,
        )
        .unwrap();

        assert!(result.is_none());
        assert_eq!(
            errors.get(&format!("{ALL_TYPES}:members.value")).unwrap(),
            [format!(
                "Required sub-attribute '{ALL_TYPES}:members.value' is missing"
            )]
        );
    }

    #[test]
    fn test_check_elements_only_empty_without_required() {
        let rt = all_types();
        let mut errors = FieldErrors::new();
        let result = check_elements(
            &rt,
            top("multiComplex"),
            vec![json!({})],
            Completeness::Whole,
            false,
            &mut errors,
        )
        .unwrap();

        assert!(result.is_none());
        assert!(
            errors.get(&format!("{ALL_TYPES}:multiComplex")).unwrap()[0]
                .contains("must contain at least one non-empty element")
        );
    }

    #[test]
    fn test_check_elements_unknown_sub_attribute() {
        let rt = all_types();
        let mut errors = FieldErrors::new();

        let err = check_elements(
            &rt,
            top("multiComplex"),
            vec![json!({"bogus": 1})],
            Completeness::Whole,
            false,
            &mut errors,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PatchError::UnknownAttribute(format!("{ALL_TYPES}:multiComplex.bogus"))
        );

        let ignored = check_elements(
            &rt,
            top("multiComplex"),
            vec![json!({"bogus": 1, "number": 3})],
            Completeness::Whole,
            true,
            &mut errors,
        )
        .unwrap()
        .unwrap();
        assert_eq!(Value::Object(ignored[0].clone()), json!({"number": 3}));
    }

    #[test]
    fn test_check_elements_partial_skips_required() {
        let rt = all_types();
        let mut errors = FieldErrors::new();
        let elements = check_elements(
            &rt,
            top("members"),
            vec![json!({"display": "Bob"})],
            Completeness::Partial,
            false,
            &mut errors,
        )
        .unwrap();
        assert!(elements.is_some());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_check_elements_non_object() {
        let rt = all_types();
        let mut errors = FieldErrors::new();
        let result = check_elements(
            &rt,
            top("multiComplex"),
            vec![json!("text")],
            Completeness::Whole,
            false,
            &mut errors,
        )
        .unwrap();

        assert!(result.is_none());
        let field = format!("{ALL_TYPES}:multiComplex");
        assert_eq!(
            errors.get(&field).unwrap(),
            [
                r#"Found unsupported value in multivalued attribute '["text"]'"#.to_string(),
                format!(
                    "Value of attribute '{field}' is not of type 'complex' but of type 'string' with value '\"text\"'"
                ),
            ]
        );
    }
}
