//! The seven operation appliers and the handler that dispatches to them.

use serde_json::{Map, Value};

use super::{
    FieldErrors, PatchError, PatchOpKind,
    operation::{
        AtomicOperation, MultivaluedComplexAttributeOperation,
        MultivaluedComplexMultivaluedSubAttributeOperation,
        MultivaluedComplexSimpleSubAttributeOperation, MultivaluedSimpleAttributeOperation,
        RemoveComplexAttributeOperation, RemoveExtensionRefOperation, SimpleAttributeOperation,
        into_values,
    },
    tracker::ChangeTracker,
    tree::{self, Object},
    validate::{self, Completeness},
};
use crate::scim::{
    evaluate::FilterEvaluator,
    filter::Filter,
    schema::{AttrId, Mutability, ResourceType},
};

/// Mutable state shared by the appliers for one request.
pub struct ApplyContext<'a> {
    pub resource_type: &'a ResourceType,
    /// The working copy of the resource
    pub resource: &'a mut Object,
    pub errors: &'a mut FieldErrors,
    pub tracker: &'a mut ChangeTracker,
    pub ignore_unknown_attribute: bool,
}

/// Receives classified operations.
///
/// Every method defaults to the standard applier; implementors override the
/// ones they need to observe or replace.
pub trait OperationHandler {
    fn simple(
        &self,
        ctx: &mut ApplyContext<'_>,
        op: &SimpleAttributeOperation,
    ) -> Result<(), PatchError> {
        apply_simple(ctx, op)
    }

    fn multivalued_simple(
        &self,
        ctx: &mut ApplyContext<'_>,
        op: &MultivaluedSimpleAttributeOperation,
    ) -> Result<(), PatchError> {
        apply_multivalued_simple(ctx, op)
    }

    fn remove_complex(
        &self,
        ctx: &mut ApplyContext<'_>,
        op: &RemoveComplexAttributeOperation,
    ) -> Result<(), PatchError> {
        apply_remove_complex(ctx, op)
    }

    fn multivalued_complex(
        &self,
        ctx: &mut ApplyContext<'_>,
        op: &MultivaluedComplexAttributeOperation,
    ) -> Result<(), PatchError> {
        apply_multivalued_complex(ctx, op)
    }

    fn multivalued_complex_simple_sub(
        &self,
        ctx: &mut ApplyContext<'_>,
        op: &MultivaluedComplexSimpleSubAttributeOperation,
    ) -> Result<(), PatchError> {
        apply_multivalued_complex_simple_sub(ctx, op)
    }

    fn multivalued_complex_multivalued_sub(
        &self,
        ctx: &mut ApplyContext<'_>,
        op: &MultivaluedComplexMultivaluedSubAttributeOperation,
    ) -> Result<(), PatchError> {
        apply_multivalued_complex_multivalued_sub(ctx, op)
    }

    fn remove_extension_ref(
        &self,
        ctx: &mut ApplyContext<'_>,
        op: &RemoveExtensionRefOperation,
    ) -> Result<(), PatchError> {
        apply_remove_extension_ref(ctx, op)
    }
}

/// Applies every operation with the standard appliers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOperationHandler;

impl OperationHandler for DefaultOperationHandler {}

pub fn dispatch<H: OperationHandler + ?Sized>(
    handler: &H,
    ctx: &mut ApplyContext<'_>,
    operation: &AtomicOperation,
) -> Result<(), PatchError> {
    match operation {
        AtomicOperation::Simple(op) => handler.simple(ctx, op),
        AtomicOperation::MultivaluedSimple(op) => handler.multivalued_simple(ctx, op),
        AtomicOperation::RemoveComplex(op) => handler.remove_complex(ctx, op),
        AtomicOperation::MultivaluedComplex(op) => handler.multivalued_complex(ctx, op),
        AtomicOperation::MultivaluedComplexSimpleSub(op) => {
            handler.multivalued_complex_simple_sub(ctx, op)
        }
        AtomicOperation::MultivaluedComplexMultivaluedSub(op) => {
            handler.multivalued_complex_multivalued_sub(ctx, op)
        }
        AtomicOperation::RemoveExtensionRef(op) => handler.remove_extension_ref(ctx, op),
    }
}

// =============================================================================
// Shared checks
// =============================================================================

fn no_target(op: PatchOpKind, path: &str) -> PatchError {
    PatchError::NoTarget(format!(
        "Cannot apply patch operation '{}' on path '{}': no matching object was found",
        op, path
    ))
}

/// Refuse to change an immutable attribute that already holds another value.
fn check_immutable(
    resource_type: &ResourceType,
    attribute: AttrId,
    existing: Option<&Value>,
    new: Option<&Value>,
) -> Result<(), PatchError> {
    let definition = resource_type.attribute(attribute);
    if definition.mutability != Mutability::Immutable {
        return Ok(());
    }
    match existing {
        Some(existing) if !existing.is_null() && Some(existing) != new => {
            Err(PatchError::Mutability(format!(
                "Attribute '{}' is immutable and already has a value",
                definition.full_name
            )))
        }
        _ => Ok(()),
    }
}

/// Record an error when a required top-level attribute would be removed.
fn check_removable(ctx: &mut ApplyContext<'_>, attribute: AttrId) -> bool {
    let definition = ctx.resource_type.attribute(attribute);
    if definition.required && definition.parent().is_none() {
        ctx.errors.push(
            definition.full_name.clone(),
            format!(
                "Required attribute '{}' cannot be removed",
                definition.full_name
            ),
        );
        return false;
    }
    true
}

/// Remove `attribute` from the object holding it.
fn remove_attribute(ctx: &mut ApplyContext<'_>, attribute: AttrId) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let definition = rt.attribute(attribute);
    let Some(container) = tree::attribute_container(ctx.resource, rt, attribute, false)? else {
        return Ok(());
    };
    let existing = tree::get(container, &definition.name).cloned();
    check_immutable(rt, attribute, existing.as_ref(), None)?;

    if let Some(removed) = tree::remove(container, &definition.name) {
        ctx.tracker.record(&definition.full_name, !removed.is_null());
    }
    tree::prune(ctx.resource, rt, attribute);
    Ok(())
}

/// Append `values` to `array`, skipping ones already present.
fn append_distinct(array: &mut Vec<Value>, values: impl IntoIterator<Item = Value>) {
    for value in values {
        if !array.contains(&value) {
            array.push(value);
        }
    }
}

// =============================================================================
// Appliers
// =============================================================================

/// Set or remove a single-valued simple attribute.
pub fn apply_simple(
    ctx: &mut ApplyContext<'_>,
    op: &SimpleAttributeOperation,
) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let definition = rt.attribute(op.attribute);

    let value = match (&op.op, &op.value) {
        (PatchOpKind::Remove, _) | (_, None) => {
            if check_removable(ctx, op.attribute) {
                remove_attribute(ctx, op.attribute)?;
            }
            return Ok(());
        }
        (_, Some(value)) => value,
    };

    if !validate::check_value(rt, op.attribute, value, ctx.errors) {
        return Ok(());
    }

    if let Some(existing) = tree::attribute_container(ctx.resource, rt, op.attribute, false)?
        .and_then(|container| tree::get(container, &definition.name))
    {
        check_immutable(rt, op.attribute, Some(existing), Some(value))?;
    }

    let container = tree::attribute_container(ctx.resource, rt, op.attribute, true)?
        .ok_or_else(|| PatchError::MalformedResource(definition.full_name.clone()))?;
    let changed = tree::set(container, &definition.name, value.clone());
    ctx.tracker.record(&definition.full_name, changed);
    Ok(())
}

/// Append to, overwrite or remove a multivalued simple attribute.
pub fn apply_multivalued_simple(
    ctx: &mut ApplyContext<'_>,
    op: &MultivaluedSimpleAttributeOperation,
) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let definition = rt.attribute(op.attribute);

    if op.op == PatchOpKind::Remove || (op.op == PatchOpKind::Replace && op.values.is_empty()) {
        if check_removable(ctx, op.attribute) {
            remove_attribute(ctx, op.attribute)?;
        }
        return Ok(());
    }

    if !validate::check_values(rt, op.attribute, &op.values, ctx.errors) {
        return Ok(());
    }

    let existing = tree::attribute_container(ctx.resource, rt, op.attribute, false)?
        .and_then(|container| tree::get(container, &definition.name))
        .cloned();

    let updated = match op.op {
        PatchOpKind::Add => {
            let mut array = into_values(existing.clone());
            append_distinct(&mut array, op.values.iter().cloned());
            array
        }
        _ => op.values.clone(),
    };
    check_immutable(
        rt,
        op.attribute,
        existing.as_ref(),
        Some(&Value::Array(updated.clone())),
    )?;

    let container = tree::attribute_container(ctx.resource, rt, op.attribute, true)?
        .ok_or_else(|| PatchError::MalformedResource(definition.full_name.clone()))?;
    let changed = tree::set(container, &definition.name, Value::Array(updated));
    ctx.tracker.record(&definition.full_name, changed);
    Ok(())
}

/// Remove a whole single-valued complex attribute.
pub fn apply_remove_complex(
    ctx: &mut ApplyContext<'_>,
    op: &RemoveComplexAttributeOperation,
) -> Result<(), PatchError> {
    if check_removable(ctx, op.attribute) {
        remove_attribute(ctx, op.attribute)?;
    }
    Ok(())
}

/// Indices of the elements of `array` selected by `filter`, or all of them.
fn select(
    resource_type: &ResourceType,
    complex: AttrId,
    filter: Option<&Filter>,
    array: &[Value],
) -> Vec<usize> {
    let Some(filter) = filter else {
        return (0..array.len()).collect();
    };
    let evaluator = FilterEvaluator::new(resource_type, complex);
    let selected: Vec<usize> = array
        .iter()
        .enumerate()
        .filter(|(_, element)| evaluator.matches(filter, element))
        .map(|(index, _)| index)
        .collect();
    tracing::trace!(
        attribute = %resource_type.attribute(complex).full_name,
        filter = %filter,
        selected = selected.len(),
        total = array.len(),
        "Evaluated value filter"
    );
    selected
}

fn is_primary(element: &Value) -> bool {
    element
        .as_object()
        .and_then(|map| tree::get(map, "primary"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Keep `primary: true` only on the element at `keep`.
fn clear_other_primaries(array: &mut [Value], keep: usize) {
    for (index, element) in array.iter_mut().enumerate() {
        if index != keep
            && is_primary(element)
            && let Some(map) = element.as_object_mut()
        {
            tree::set(map, "primary", Value::Bool(false));
        }
    }
}

fn enforce_single_primary(array: &mut [Value], candidates: &[usize]) {
    if let Some(&keep) = candidates.iter().rev().find(|&&i| is_primary(&array[i])) {
        clear_other_primaries(array, keep);
    }
}

/// Whether `element` has every member of `pattern` with an equal value.
fn element_matches(element: &Value, pattern: &Object) -> bool {
    let Some(element) = element.as_object() else {
        return false;
    };
    pattern
        .iter()
        .all(|(key, value)| tree::get(element, key) == Some(value))
}

/// Write the multivalued complex attribute back, removing it when empty.
fn store_array(
    ctx: &mut ApplyContext<'_>,
    attribute: AttrId,
    array: Vec<Value>,
    before: Option<&Value>,
) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let definition = rt.attribute(attribute);

    if array.is_empty() {
        if before.is_some_and(|v| !v.is_null()) {
            remove_attribute(ctx, attribute)?;
        }
        return Ok(());
    }

    let container = tree::schema_container(ctx.resource, rt, attribute, true)?
        .ok_or_else(|| PatchError::MalformedResource(definition.full_name.clone()))?;
    let changed = tree::set(container, &definition.name, Value::Array(array));
    ctx.tracker.record(&definition.full_name, changed);
    Ok(())
}

fn current_array(
    ctx: &mut ApplyContext<'_>,
    attribute: AttrId,
) -> Result<Option<Value>, PatchError> {
    let rt = ctx.resource_type;
    Ok(tree::schema_container(ctx.resource, rt, attribute, false)?
        .and_then(|container| tree::get(container, &rt.attribute(attribute).name))
        .cloned())
}

/// Add, replace or remove elements of a multivalued complex attribute.
pub fn apply_multivalued_complex(
    ctx: &mut ApplyContext<'_>,
    op: &MultivaluedComplexAttributeOperation,
) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let existing = current_array(ctx, op.attribute)?;
    let mut array = into_values(existing.clone());

    if let Some(filter) = &op.filter {
        let selected = select(rt, op.attribute, Some(filter), &array);
        return match op.op {
            PatchOpKind::Remove => {
                if selected.is_empty() {
                    tracing::debug!(path = %op.path, "Value filter matched nothing to remove");
                    return Ok(());
                }
                let mut index = 0;
                array.retain(|_| {
                    let keep = !selected.contains(&index);
                    index += 1;
                    keep
                });
                if array.is_empty() && !check_removable(ctx, op.attribute) {
                    return Ok(());
                }
                store_array(ctx, op.attribute, array, existing.as_ref())
            }
            PatchOpKind::Add | PatchOpKind::Replace => {
                if selected.is_empty() {
                    return Err(no_target(op.op, &op.path));
                }
                let completeness = if op.op == PatchOpKind::Add {
                    Completeness::Partial
                } else {
                    Completeness::Whole
                };
                let Some(elements) = validate::check_elements(
                    rt,
                    op.attribute,
                    op.values.clone(),
                    completeness,
                    ctx.ignore_unknown_attribute,
                    ctx.errors,
                )?
                else {
                    return Ok(());
                };
                // Several supplied elements merge into one
                let mut patch = Map::new();
                for element in elements {
                    patch.extend(element);
                }
                for &index in &selected {
                    if op.op == PatchOpKind::Replace {
                        array[index] = Value::Object(patch.clone());
                    } else if let Some(target) = array[index].as_object_mut() {
                        for (key, value) in &patch {
                            tree::set(target, key, value.clone());
                        }
                    }
                }
                enforce_single_primary(&mut array, &selected);
                store_array(ctx, op.attribute, array, existing.as_ref())
            }
        };
    }

    match op.op {
        PatchOpKind::Remove if op.values.is_empty() => {
            if check_removable(ctx, op.attribute) {
                remove_attribute(ctx, op.attribute)?;
            }
            Ok(())
        }
        PatchOpKind::Remove => {
            let patterns: Vec<Object> = op
                .values
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .filter(|pattern| !pattern.is_empty())
                .collect();
            if patterns.is_empty() {
                tracing::debug!(path = %op.path, "No non-empty element to remove");
                return Ok(());
            }
            array.retain(|element| !patterns.iter().any(|p| element_matches(element, p)));
            if array.is_empty() && !check_removable(ctx, op.attribute) {
                return Ok(());
            }
            store_array(ctx, op.attribute, array, existing.as_ref())
        }
        PatchOpKind::Replace if op.values.is_empty() => {
            if check_removable(ctx, op.attribute) {
                remove_attribute(ctx, op.attribute)?;
            }
            Ok(())
        }
        PatchOpKind::Add | PatchOpKind::Replace => {
            let Some(elements) = validate::check_elements(
                rt,
                op.attribute,
                op.values.clone(),
                Completeness::Whole,
                ctx.ignore_unknown_attribute,
                ctx.errors,
            )?
            else {
                return Ok(());
            };

            let start = if op.op == PatchOpKind::Replace {
                array.clear();
                0
            } else {
                array.len()
            };
            append_distinct(&mut array, elements.into_iter().map(Value::Object));
            let added: Vec<usize> = (start..array.len()).collect();
            enforce_single_primary(&mut array, &added);
            store_array(ctx, op.attribute, array, existing.as_ref())
        }
    }
}

/// Fan a leaf mutation out over the selected elements of a multivalued
/// complex attribute.
///
/// Without a filter, an ADD or REPLACE on an absent or empty attribute
/// creates one element holding just the sub-attribute.
#[allow(clippy::too_many_arguments)]
fn fan_out(
    ctx: &mut ApplyContext<'_>,
    op: PatchOpKind,
    parent: AttrId,
    attribute: AttrId,
    filter: Option<&Filter>,
    path: &str,
    mutate: impl Fn(&mut Object, &str) -> Result<(), PatchError>,
    seed: Option<Value>,
) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let name = rt.attribute(attribute).name.clone();
    let existing = current_array(ctx, parent)?;
    let mut array = into_values(existing.clone());

    let selected = select(rt, parent, filter, &array);
    if selected.is_empty() {
        if op == PatchOpKind::Remove {
            tracing::debug!(path, "Nothing selected to remove");
            return Ok(());
        }
        if filter.is_some() {
            return Err(no_target(op, path));
        }
        let Some(seed) = seed else {
            return Ok(());
        };
        let mut element = Map::new();
        element.insert(name, seed);
        array.push(Value::Object(element));
        return store_array(ctx, parent, array, existing.as_ref());
    }

    for &index in &selected {
        if let Some(element) = array[index].as_object_mut() {
            mutate(element, &name)?;
        }
    }

    if name.eq_ignore_ascii_case("primary") && op != PatchOpKind::Remove {
        enforce_single_primary(&mut array, &selected);
    }
    // Only elements emptied by this mutation are dropped
    let mut index = 0;
    array.retain(|element| {
        let emptied = selected.contains(&index) && element.as_object().is_some_and(Map::is_empty);
        index += 1;
        !emptied
    });
    store_array(ctx, parent, array, existing.as_ref())
}

/// Set or clear a simple sub-attribute on selected elements.
pub fn apply_multivalued_complex_simple_sub(
    ctx: &mut ApplyContext<'_>,
    op: &MultivaluedComplexSimpleSubAttributeOperation,
) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let value = match op.op {
        PatchOpKind::Remove => None,
        _ => op.value.clone(),
    };
    if let Some(value) = &value
        && !validate::check_sub_value(rt, op.parent, op.attribute, value, ctx.errors)
    {
        return Ok(());
    }

    let seed = value.clone();
    fan_out(
        ctx,
        op.op,
        op.parent,
        op.attribute,
        op.filter.as_ref(),
        &op.path,
        |element, name| {
            let existing = tree::get(element, name).cloned();
            check_immutable(rt, op.attribute, existing.as_ref(), value.as_ref())?;
            match &value {
                Some(value) => {
                    tree::set(element, name, value.clone());
                }
                None => {
                    tree::remove(element, name);
                }
            }
            Ok(())
        },
        seed,
    )
}

/// Append to, overwrite or clear a multivalued sub-attribute on selected
/// elements.
pub fn apply_multivalued_complex_multivalued_sub(
    ctx: &mut ApplyContext<'_>,
    op: &MultivaluedComplexMultivaluedSubAttributeOperation,
) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let clear = op.op == PatchOpKind::Remove || op.values.is_empty();
    if !clear {
        let value = Value::Array(op.values.clone());
        if !validate::check_sub_value(rt, op.parent, op.attribute, &value, ctx.errors) {
            return Ok(());
        }
    }

    let seed = (!clear).then(|| Value::Array(op.values.clone()));
    fan_out(
        ctx,
        op.op,
        op.parent,
        op.attribute,
        op.filter.as_ref(),
        &op.path,
        |element, name| {
            let existing = tree::get(element, name).cloned();
            let updated = if clear {
                None
            } else if op.op == PatchOpKind::Add {
                let mut array = into_values(existing.clone());
                append_distinct(&mut array, op.values.iter().cloned());
                Some(Value::Array(array))
            } else {
                Some(Value::Array(op.values.clone()))
            };
            check_immutable(rt, op.attribute, existing.as_ref(), updated.as_ref())?;
            match updated {
                Some(updated) => {
                    tree::set(element, name, updated);
                }
                None => {
                    tree::remove(element, name);
                }
            }
            Ok(())
        },
        seed,
    )
}

/// Remove an extension's content and its `schemas` entry.
pub fn apply_remove_extension_ref(
    ctx: &mut ApplyContext<'_>,
    op: &RemoveExtensionRefOperation,
) -> Result<(), PatchError> {
    let rt = ctx.resource_type;
    let extension = &rt.extensions()[op.extension];
    if extension.required {
        ctx.errors.push(
            extension.id.clone(),
            format!("Required extension '{}' cannot be removed", extension.id),
        );
        return Ok(());
    }

    let removed = tree::remove(ctx.resource, &extension.id);
    tree::remove_schema_uri(ctx.resource, &extension.id);
    ctx.tracker
        .record(&extension.id, removed.is_some_and(|v| !v.is_null()));
    Ok(())
}
