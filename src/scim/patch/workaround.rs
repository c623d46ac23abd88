//! Vendor dialect workarounds consulted before the default handler.

use std::fmt;

use serde_json::{Number, Value};

use super::{
    PatchError, PatchOpKind,
    apply::ApplyContext,
    operation::{AtomicOperation, MultivaluedComplexSimpleSubAttributeOperation},
    tree,
    validate::{self, Completeness},
};
use crate::scim::{
    evaluate::FilterEvaluator,
    filter::{CompareOp, Filter, FilterValue},
    schema::{AttrId, AttributeType, ResourceType},
};

/// What a workaround did with an operation.
#[derive(Debug)]
pub enum WorkaroundOutcome {
    /// Pass the (possibly rewritten) operation on
    Continue(AtomicOperation),
    /// The workaround applied the operation itself
    Handled,
}

/// A strategy that may rewrite or take over classified operations.
///
/// Workarounds run in registration order; the first to return
/// [`WorkaroundOutcome::Handled`] ends processing of that operation.
pub trait PatchWorkaround: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn intercept(
        &self,
        ctx: &mut ApplyContext<'_>,
        operation: AtomicOperation,
    ) -> Result<WorkaroundOutcome, PatchError>;
}

/// Microsoft Entra ID (Azure AD) provisioning dialect.
///
/// - Boolean attributes arrive as the strings `"True"` / `"False"`.
/// - `emails[type eq "work"].value` on a user without a work email means
///   "add an element with `type` work and this `value`".
#[derive(Debug, Default, Clone, Copy)]
pub struct MsAzureWorkaround;

impl PatchWorkaround for MsAzureWorkaround {
    fn name(&self) -> &'static str {
        "ms_azure"
    }

    fn intercept(
        &self,
        ctx: &mut ApplyContext<'_>,
        mut operation: AtomicOperation,
    ) -> Result<WorkaroundOutcome, PatchError> {
        let rt = ctx.resource_type;
        match &mut operation {
            AtomicOperation::Simple(op) => {
                if let Some(value) = &mut op.value {
                    coerce_for(rt, op.attribute, value);
                }
            }
            AtomicOperation::MultivaluedSimple(op) => {
                op.values
                    .iter_mut()
                    .for_each(|value| coerce_for(rt, op.attribute, value));
            }
            AtomicOperation::MultivaluedComplex(op) => {
                for element in &mut op.values {
                    coerce_element(rt, op.attribute, element);
                }
            }
            AtomicOperation::MultivaluedComplexSimpleSub(op) => {
                if let Some(value) = &mut op.value {
                    coerce_for(rt, op.attribute, value);
                }
                if create_filtered_element(ctx, op)? {
                    return Ok(WorkaroundOutcome::Handled);
                }
            }
            AtomicOperation::MultivaluedComplexMultivaluedSub(op) => {
                op.values
                    .iter_mut()
                    .for_each(|value| coerce_for(rt, op.attribute, value));
            }
            AtomicOperation::RemoveComplex(_) | AtomicOperation::RemoveExtensionRef(_) => {}
        }
        Ok(WorkaroundOutcome::Continue(operation))
    }
}

fn coerce_bool(value: &mut Value) {
    if let Value::String(s) = value {
        if s.eq_ignore_ascii_case("true") {
            *value = Value::Bool(true);
        } else if s.eq_ignore_ascii_case("false") {
            *value = Value::Bool(false);
        }
    }
}

fn coerce_for(resource_type: &ResourceType, attribute: AttrId, value: &mut Value) {
    if resource_type.attribute(attribute).attr_type != AttributeType::Boolean {
        return;
    }
    match value {
        Value::Array(items) => items.iter_mut().for_each(coerce_bool),
        other => coerce_bool(other),
    }
}

fn coerce_element(resource_type: &ResourceType, complex: AttrId, element: &mut Value) {
    let Some(map) = element.as_object_mut() else {
        return;
    };
    for (key, value) in map.iter_mut() {
        if let Some(sub) = resource_type.find_sub_attribute(complex, key) {
            coerce_for(resource_type, sub, value);
        }
    }
}

/// `attr eq literal` terms of a filter made only of equality conjunctions.
fn equality_terms(filter: &Filter) -> Option<Vec<(&str, Value)>> {
    match filter {
        Filter::Compare {
            attr,
            op: CompareOp::Eq,
            value,
        } => {
            let value = match value {
                FilterValue::String(s) => Value::String(s.clone()),
                FilterValue::Bool(b) => Value::Bool(*b),
                FilterValue::Integer(i) => Value::Number((*i).into()),
                FilterValue::Decimal(d) => Value::Number(Number::from_f64(*d)?),
                FilterValue::Null => return None,
            };
            Some(vec![(attr.as_str(), value)])
        }
        Filter::And(left, right) => {
            let mut terms = equality_terms(left)?;
            terms.extend(equality_terms(right)?);
            Some(terms)
        }
        _ => None,
    }
}

/// Append a new element built from the filter's equality terms and the
/// operation's value when the filter selects nothing.
///
/// Returns whether the operation was consumed.
fn create_filtered_element(
    ctx: &mut ApplyContext<'_>,
    op: &MultivaluedComplexSimpleSubAttributeOperation,
) -> Result<bool, PatchError> {
    let rt = ctx.resource_type;
    let (Some(filter), Some(value)) = (&op.filter, &op.value) else {
        return Ok(false);
    };
    if op.op == PatchOpKind::Remove {
        return Ok(false);
    }
    let Some(terms) = equality_terms(filter) else {
        return Ok(false);
    };

    let parent = rt.attribute(op.parent);
    let mut array = match tree::schema_container(ctx.resource, rt, op.parent, false)?
        .and_then(|container| tree::get(container, &parent.name))
    {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let evaluator = FilterEvaluator::new(rt, op.parent);
    if array.iter().any(|element| evaluator.matches(filter, element)) {
        return Ok(false);
    }

    let mut element = serde_json::Map::new();
    for (name, literal) in terms {
        element.insert(name.to_string(), literal);
    }
    element.insert(rt.attribute(op.attribute).name.clone(), value.clone());

    let Some(elements) = validate::check_elements(
        rt,
        op.parent,
        vec![Value::Object(element)],
        Completeness::Whole,
        ctx.ignore_unknown_attribute,
        ctx.errors,
    )?
    else {
        return Ok(true);
    };

    tracing::debug!(path = %op.path, "Creating element selected by value filter");
    array.extend(elements.into_iter().map(Value::Object));
    let container = tree::schema_container(ctx.resource, rt, op.parent, true)?
        .ok_or_else(|| PatchError::MalformedResource(parent.full_name.clone()))?;
    let changed = tree::set(container, &parent.name, Value::Array(array));
    ctx.tracker.record(&parent.full_name, changed);
    Ok(true)
}
