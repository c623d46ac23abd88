//! Value filter evaluation against elements of a multivalued complex attribute.
//!
//! Sub-attribute names are matched case-insensitively. String comparisons
//! honour the sub-attribute's `caseExact` flag; `dateTime` sub-attributes
//! compare as instants. A multivalued sub-attribute matches when any of its
//! values matches, so `numberArray eq 5` and `numberArray co 5` both select
//! elements whose array contains 5.

use std::cmp::Ordering;

use chrono::DateTime;
use serde_json::Value;

use super::{
    filter::{CompareOp, Filter, FilterValue},
    schema::{AttrId, AttributeType, ResourceType},
};

/// Evaluates filters for one multivalued complex attribute.
pub struct FilterEvaluator<'a> {
    resource_type: &'a ResourceType,
    complex: AttrId,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(resource_type: &'a ResourceType, complex: AttrId) -> Self {
        Self {
            resource_type,
            complex,
        }
    }

    /// Whether `element` satisfies `filter`. Non-object elements never match.
    pub fn matches(&self, filter: &Filter, element: &Value) -> bool {
        match filter {
            Filter::And(left, right) => {
                self.matches(left, element) && self.matches(right, element)
            }
            Filter::Or(left, right) => self.matches(left, element) || self.matches(right, element),
            Filter::Not(inner) => element.is_object() && !self.matches(inner, element),
            Filter::Present { attr } => lookup(element, attr).is_some_and(is_present),
            Filter::Compare { attr, op, value } => {
                if !element.is_object() {
                    return false;
                }
                let actual = lookup(element, attr);
                self.compare(attr, actual, *op, value)
            }
        }
    }

    fn compare(
        &self,
        attr: &str,
        actual: Option<&Value>,
        op: CompareOp,
        expected: &FilterValue,
    ) -> bool {
        let actual = actual.filter(|v| !v.is_null());

        if let FilterValue::Null = expected {
            return match op {
                CompareOp::Eq => actual.is_none(),
                CompareOp::Ne => actual.is_some(),
                _ => false,
            };
        }
        let Some(actual) = actual else {
            return false;
        };

        let (case_exact, attr_type) = self
            .resource_type
            .find_sub_attribute(self.complex, attr)
            .map(|id| {
                let sub = self.resource_type.attribute(id);
                (sub.case_exact, sub.attr_type)
            })
            .unwrap_or((false, AttributeType::String));

        match actual {
            Value::Array(items) => {
                // `co` on a multivalued primitive means "contains this element",
                // `ne` means "no element equals"
                let (op, negate) = match op {
                    CompareOp::Co => (CompareOp::Eq, false),
                    CompareOp::Ne => (CompareOp::Eq, true),
                    other => (other, false),
                };
                let any = items
                    .iter()
                    .any(|item| compare_scalar(item, op, expected, case_exact, attr_type));
                any != negate
            }
            scalar => compare_scalar(scalar, op, expected, case_exact, attr_type),
        }
    }
}

fn lookup<'v>(element: &'v Value, name: &str) -> Option<&'v Value> {
    element
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn compare_scalar(
    actual: &Value,
    op: CompareOp,
    expected: &FilterValue,
    case_exact: bool,
    attr_type: AttributeType,
) -> bool {
    match (actual, expected) {
        (Value::String(a), FilterValue::String(e)) => {
            if attr_type == AttributeType::DateTime
                && let (Ok(a), Ok(e)) = (
                    DateTime::parse_from_rfc3339(a),
                    DateTime::parse_from_rfc3339(e),
                )
            {
                return ordered(a.cmp(&e), op);
            }
            if case_exact {
                compare_strings(a, e, op)
            } else {
                compare_strings(&a.to_lowercase(), &e.to_lowercase(), op)
            }
        }
        (Value::Bool(a), FilterValue::Bool(e)) => match op {
            CompareOp::Eq => a == e,
            CompareOp::Ne => a != e,
            _ => false,
        },
        (Value::Number(a), FilterValue::Integer(e)) => match a.as_i64() {
            Some(a) => ordered(a.cmp(e), op),
            None => a
                .as_f64()
                .and_then(|a| a.partial_cmp(&(*e as f64)))
                .is_some_and(|ord| ordered(ord, op)),
        },
        (Value::Number(a), FilterValue::Decimal(e)) => a
            .as_f64()
            .and_then(|a| a.partial_cmp(e))
            .is_some_and(|ord| ordered(ord, op)),
        // Values of different types are never equal
        _ => op == CompareOp::Ne,
    }
}

fn compare_strings(actual: &str, expected: &str, op: CompareOp) -> bool {
    match op {
        CompareOp::Co => actual.contains(expected),
        CompareOp::Sw => actual.starts_with(expected),
        CompareOp::Ew => actual.ends_with(expected),
        _ => ordered(actual.cmp(expected), op),
    }
}

/// Apply an ordering comparison operator. Substring operators never match
/// non-string values.
fn ordered(ord: Ordering, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Co | CompareOp::Sw | CompareOp::Ew => false,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::scim::{filter::parse_filter, schema::SchemaRef, test_support::all_types};

    fn eval(filter: &str, element: Value) -> bool {
        let rt = all_types();
        let complex = rt.find_attribute(SchemaRef::Main, "multiComplex").unwrap();
        FilterEvaluator::new(&rt, complex).matches(&parse_filter(filter).unwrap(), &element)
    }

    #[rstest]
    #[case::string_eq_ignores_case(r#"string eq "HELLO""#, true)]
    #[case::string_ne(r#"string ne "hello""#, false)]
    #[case::string_co(r#"string co "ell""#, true)]
    #[case::string_sw(r#"string sw "he""#, true)]
    #[case::string_ew(r#"string ew "lo""#, true)]
    #[case::string_gt(r#"string gt "a""#, true)]
    #[case::case_exact_eq(r#"caseExactString eq "mixed""#, false)]
    #[case::case_exact_exact(r#"caseExactString eq "MiXeD""#, true)]
    #[case::number_eq("number eq 2", true)]
    #[case::number_ge("number ge 3", false)]
    #[case::number_lt_decimal("number lt 2.5", true)]
    #[case::decimal_gt("decimal gt 1", true)]
    #[case::bool_eq("bool eq true", true)]
    #[case::bool_gt("bool gt false", false)]
    #[case::array_co("numberArray co 5", true)]
    #[case::array_eq("numberArray eq 7", true)]
    #[case::array_miss("numberArray eq 8", false)]
    #[case::array_ne_contained("numberArray ne 5", false)]
    #[case::array_ne_absent("numberArray ne 8", true)]
    #[case::date_instant(r#"date gt "2020-01-01T00:30:00+02:00""#, true)]
    #[case::date_instant_equal(r#"date eq "2020-01-01T00:00:00+01:00""#, true)]
    #[case::present("string pr", true)]
    #[case::empty_not_present("stringArray pr", false)]
    #[case::absent_not_present("binary pr", false)]
    #[case::null_eq("binary eq null", true)]
    #[case::null_ne("string ne null", true)]
    #[case::type_mismatch_eq(r#"number eq "2""#, false)]
    #[case::type_mismatch_ne(r#"number ne "2""#, true)]
    #[case::and_short_circuit(r#"number eq 1 and string eq "hello""#, false)]
    #[case::or(r#"number eq 1 or string eq "hello""#, true)]
    #[case::not("not (number eq 1)", true)]
    #[case::key_case("NUMBER eq 2", true)]
    fn test_matches(#[case] filter: &str, #[case] expected: bool) {
        let element = json!({
            "string": "hello",
            "number": 2,
            "decimal": 1.5,
            "bool": true,
            "numberArray": [5, 7],
            "stringArray": [],
            "caseExactString": "MiXeD",
            "date": "2019-12-31T23:00:00Z"
        });
        assert_eq!(eval(filter, element), expected, "filter: {filter}");
    }

    #[test]
    fn test_non_object_never_matches() {
        assert!(!eval("number eq 1", json!(1)));
        assert!(!eval("not (number eq 1)", json!("x")));
    }
}
