//! Atomic operations and the classifier that selects one per resolved path.
//!
//! | Target shape                                   | Operation                          |
//! |------------------------------------------------|------------------------------------|
//! | simple, single-valued                          | [`SimpleAttributeOperation`]       |
//! | simple, multi-valued                           | [`MultivaluedSimpleAttributeOperation`] |
//! | single complex removed or set to null          | [`RemoveComplexAttributeOperation`] |
//! | multivalued complex as a whole                 | [`MultivaluedComplexAttributeOperation`] |
//! | simple sub-attribute of a multivalued complex  | [`MultivaluedComplexSimpleSubAttributeOperation`] |
//! | multivalued sub-attribute of a multivalued complex | [`MultivaluedComplexMultivaluedSubAttributeOperation`] |
//! | extension schema removed                       | [`RemoveExtensionRefOperation`]    |
//!
//! Sub-attributes of a single-valued complex attribute classify by their own
//! shape. Object values for a single complex attribute or an extension are
//! split per sub-attribute by the decomposer before classification.

use serde_json::Value;

use super::{FieldErrors, PatchError, PatchOpKind, validate};
use crate::scim::{
    filter::Filter,
    schema::{AttrId, ResourceType, ResolvedAttribute},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleAttributeOperation {
    pub op: PatchOpKind,
    pub attribute: AttrId,
    /// `None` clears the attribute
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultivaluedSimpleAttributeOperation {
    pub op: PatchOpKind,
    pub attribute: AttrId,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveComplexAttributeOperation {
    pub attribute: AttrId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultivaluedComplexAttributeOperation {
    pub op: PatchOpKind,
    pub attribute: AttrId,
    /// Selects the elements to remove, replace or merge into
    pub filter: Option<Filter>,
    pub values: Vec<Value>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultivaluedComplexSimpleSubAttributeOperation {
    pub op: PatchOpKind,
    pub parent: AttrId,
    pub attribute: AttrId,
    pub filter: Option<Filter>,
    /// `None` clears the sub-attribute on every selected element
    pub value: Option<Value>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultivaluedComplexMultivaluedSubAttributeOperation {
    pub op: PatchOpKind,
    pub parent: AttrId,
    pub attribute: AttrId,
    pub filter: Option<Filter>,
    pub values: Vec<Value>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveExtensionRefOperation {
    /// Index into the resource type's extensions
    pub extension: usize,
}

/// One strongly-typed mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicOperation {
    Simple(SimpleAttributeOperation),
    MultivaluedSimple(MultivaluedSimpleAttributeOperation),
    RemoveComplex(RemoveComplexAttributeOperation),
    MultivaluedComplex(MultivaluedComplexAttributeOperation),
    MultivaluedComplexSimpleSub(MultivaluedComplexSimpleSubAttributeOperation),
    MultivaluedComplexMultivaluedSub(MultivaluedComplexMultivaluedSubAttributeOperation),
    RemoveExtensionRef(RemoveExtensionRefOperation),
}

impl AtomicOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            AtomicOperation::Simple(_) => "SimpleAttributeOperation",
            AtomicOperation::MultivaluedSimple(_) => "MultivaluedSimpleAttributeOperation",
            AtomicOperation::RemoveComplex(_) => "RemoveComplexAttributeOperation",
            AtomicOperation::MultivaluedComplex(_) => "MultivaluedComplexAttributeOperation",
            AtomicOperation::MultivaluedComplexSimpleSub(_) => {
                "MultivaluedComplexSimpleSubAttributeOperation"
            }
            AtomicOperation::MultivaluedComplexMultivaluedSub(_) => {
                "MultivaluedComplexMultivaluedSubAttributeOperation"
            }
            AtomicOperation::RemoveExtensionRef(_) => "RemoveExtensionRefOperation",
        }
    }

    /// The attribute this operation changes, or `None` for an extension.
    pub fn attribute(&self) -> Option<AttrId> {
        match self {
            AtomicOperation::Simple(op) => Some(op.attribute),
            AtomicOperation::MultivaluedSimple(op) => Some(op.attribute),
            AtomicOperation::RemoveComplex(op) => Some(op.attribute),
            AtomicOperation::MultivaluedComplex(op) => Some(op.attribute),
            AtomicOperation::MultivaluedComplexSimpleSub(op) => Some(op.attribute),
            AtomicOperation::MultivaluedComplexMultivaluedSub(op) => Some(op.attribute),
            AtomicOperation::RemoveExtensionRef(_) => None,
        }
    }
}

/// A JSON value as the element list of a multivalued attribute.
pub(crate) fn into_values(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

/// Select the atomic operation for `resolved`.
///
/// An object value aimed at a single complex attribute must be decomposed
/// beforehand; any other non-null value there is a type error.
pub fn classify(
    resource_type: &ResourceType,
    op: PatchOpKind,
    resolved: ResolvedAttribute,
    value: Option<Value>,
    path: &str,
) -> Result<AtomicOperation, PatchError> {
    let value = value.filter(|v| !v.is_null());
    let attribute = resource_type.attribute(resolved.attribute);
    let path = path.to_string();

    if let Some(parent) = resolved.parent
        && resource_type.attribute(parent).multi_valued
    {
        return Ok(if attribute.multi_valued {
            AtomicOperation::MultivaluedComplexMultivaluedSub(
                MultivaluedComplexMultivaluedSubAttributeOperation {
                    op,
                    parent,
                    attribute: resolved.attribute,
                    filter: resolved.filter,
                    values: into_values(value),
                    path,
                },
            )
        } else {
            AtomicOperation::MultivaluedComplexSimpleSub(
                MultivaluedComplexSimpleSubAttributeOperation {
                    op,
                    parent,
                    attribute: resolved.attribute,
                    filter: resolved.filter,
                    value,
                    path,
                },
            )
        });
    }

    if attribute.is_multi_valued_complex() {
        return Ok(AtomicOperation::MultivaluedComplex(
            MultivaluedComplexAttributeOperation {
                op,
                attribute: resolved.attribute,
                filter: resolved.filter,
                values: into_values(value),
                path,
            },
        ));
    }

    if attribute.is_complex() {
        return match value {
            None => Ok(AtomicOperation::RemoveComplex(
                RemoveComplexAttributeOperation {
                    attribute: resolved.attribute,
                },
            )),
            _ if op == PatchOpKind::Remove => Ok(AtomicOperation::RemoveComplex(
                RemoveComplexAttributeOperation {
                    attribute: resolved.attribute,
                },
            )),
            Some(Value::Object(map)) if map.is_empty() => Ok(AtomicOperation::RemoveComplex(
                RemoveComplexAttributeOperation {
                    attribute: resolved.attribute,
                },
            )),
            Some(other) => {
                let mut errors = FieldErrors::new();
                validate::type_mismatch(resource_type, resolved.attribute, &other, &mut errors);
                Err(PatchError::Validation(errors))
            }
        };
    }

    Ok(if attribute.multi_valued {
        AtomicOperation::MultivaluedSimple(MultivaluedSimpleAttributeOperation {
            op,
            attribute: resolved.attribute,
            values: into_values(value),
        })
    } else {
        AtomicOperation::Simple(SimpleAttributeOperation {
            op,
            attribute: resolved.attribute,
            value,
        })
    })
}
