//! SCIM PATCH Operations (RFC 7644 Section 3.5.2)
//!
//! Applies a [`PatchRequest`] to a resource held as a JSON tree. Every
//! operation is resolved against the resource type's schemas, classified into
//! one [`AtomicOperation`] per target attribute (path-less values are
//! decomposed first), offered to the registered [`PatchWorkaround`]s and then
//! dispatched to an [`OperationHandler`].
//!
//! The caller's resource is never modified: the engine works on a copy and
//! returns it only when every operation succeeded.
//!
//! ## Example
//!
//! ```json
//! {
//!   "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
//!   "Operations": [
//!     { "op": "replace", "path": "active", "value": false },
//!     { "op": "add", "path": "emails[type eq \"work\"].primary", "value": true },
//!     { "op": "remove", "path": "members[value eq \"2819c223\"]" }
//!   ]
//! }
//! ```

mod apply;
mod decompose;
mod error;
mod operation;
mod request;
mod tracker;
mod tree;
mod validate;
mod workaround;


use std::sync::Arc;

pub use apply::{
    ApplyContext, DefaultOperationHandler, OperationHandler, apply_multivalued_complex,
    apply_multivalued_complex_multivalued_sub, apply_multivalued_complex_simple_sub,
    apply_multivalued_simple, apply_remove_complex, apply_remove_extension_ref, apply_simple,
    dispatch,
};
pub use decompose::{Decomposer, Decomposition};
pub use error::{FieldErrors, PatchError};
pub use operation::{
    AtomicOperation, MultivaluedComplexAttributeOperation,
    MultivaluedComplexMultivaluedSubAttributeOperation,
    MultivaluedComplexSimpleSubAttributeOperation, MultivaluedSimpleAttributeOperation,
    RemoveComplexAttributeOperation, RemoveExtensionRefOperation, SimpleAttributeOperation,
    classify,
};
pub use request::{PatchOpKind, PatchOperation, PatchRequest};
use serde::Serialize;
use serde_json::Value;
pub use tracker::ChangeTracker;
pub use workaround::{MsAzureWorkaround, PatchWorkaround, WorkaroundOutcome};

use crate::{
    config::PatchConfig,
    scim::{
        path::parse_attribute_path,
        schema::{ResolveError, Resolved, ResourceType},
    },
};

/// Result of a successful patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOutcome {
    pub resource: Value,
    /// Whether any attribute content differs from the input resource
    pub changed: bool,
    /// Full names of the attributes whose content changed, in order
    pub changed_attributes: Vec<String>,
}

/// Applies PATCH requests to resources of one resource type.
#[derive(Debug)]
pub struct PatchEngine<H = DefaultOperationHandler> {
    resource_type: Arc<ResourceType>,
    ignore_unknown_attribute: bool,
    qualified_keys: bool,
    workarounds: Vec<Box<dyn PatchWorkaround>>,
    handler: H,
}

impl PatchEngine {
    pub fn new(resource_type: Arc<ResourceType>, config: &PatchConfig) -> Self {
        let mut engine = Self {
            resource_type,
            ignore_unknown_attribute: config.ignore_unknown_attribute,
            qualified_keys: false,
            workarounds: Vec::new(),
            handler: DefaultOperationHandler,
        };
        if config.workarounds.ms_azure {
            engine.qualified_keys = true;
            engine = engine.with_workaround(MsAzureWorkaround);
        }
        engine
    }
}

impl<H: OperationHandler> PatchEngine<H> {
    /// Replace the handler that receives classified operations.
    pub fn with_handler<T: OperationHandler>(self, handler: T) -> PatchEngine<T> {
        PatchEngine {
            resource_type: self.resource_type,
            ignore_unknown_attribute: self.ignore_unknown_attribute,
            qualified_keys: self.qualified_keys,
            workarounds: self.workarounds,
            handler,
        }
    }

    /// Register a workaround, consulted after those already registered.
    pub fn with_workaround(mut self, workaround: impl PatchWorkaround + 'static) -> Self {
        self.workarounds.push(Box::new(workaround));
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Apply `request` to a copy of `resource`.
    ///
    /// Type errors are collected across all operations and reported together
    /// as [`PatchError::Validation`]; any other error stops at the operation
    /// that raised it.
    #[tracing::instrument(
        skip_all,
        fields(
            resource_type = %self.resource_type.name,
            operations = request.operations.len()
        )
    )]
    pub fn apply(
        &self,
        resource: &Value,
        request: &PatchRequest,
    ) -> Result<PatchOutcome, PatchError> {
        request.validate()?;

        let Value::Object(original) = resource else {
            return Err(PatchError::MalformedResource(
                "The resource must be a JSON object".to_string(),
            ));
        };
        let mut working = original.clone();
        let mut errors = FieldErrors::new();
        let mut tracker = ChangeTracker::new();

        for (index, operation) in request.operations.iter().enumerate() {
            tracing::debug!(
                index,
                op = %operation.op,
                path = operation.path.as_deref().unwrap_or_default(),
                "Applying patch operation"
            );

            let atomic = self.expand(operation, &mut errors)?;
            let mut ctx = ApplyContext {
                resource_type: &self.resource_type,
                resource: &mut working,
                errors: &mut errors,
                tracker: &mut tracker,
                ignore_unknown_attribute: self.ignore_unknown_attribute,
            };
            for operation in atomic {
                self.execute(&mut ctx, operation)?;
            }
        }

        if !errors.is_empty() {
            tracing::debug!(fields = errors.len(), "Patch request failed validation");
            return Err(PatchError::Validation(errors));
        }

        Ok(PatchOutcome {
            resource: Value::Object(working),
            changed: tracker.is_changed(),
            changed_attributes: tracker.into_changed(),
        })
    }

    fn decomposer(&self) -> Decomposer<'_> {
        Decomposer::new(&self.resource_type)
            .ignore_unknown_attribute(self.ignore_unknown_attribute)
            .qualified_keys(self.qualified_keys)
    }

    /// Turn one request operation into atomic operations.
    fn expand(
        &self,
        operation: &PatchOperation,
        errors: &mut FieldErrors,
    ) -> Result<Vec<AtomicOperation>, PatchError> {
        let rt: &ResourceType = &self.resource_type;
        let op = operation.op;

        let Some(path) = operation.path.as_deref().filter(|p| !p.trim().is_empty()) else {
            let Some(Value::Object(value)) = &operation.value else {
                return Err(PatchError::MalformedResource(
                    "Operations without a path require a JSON object value".to_string(),
                ));
            };
            return Ok(collect(self.decomposer().resource(op, value)?, errors));
        };

        // Extension URIs need not follow attribute name syntax
        let resolved = match rt.extension_by_uri(path.trim()) {
            Some(index) => Resolved::Extension(index),
            None => {
                let parsed =
                    parse_attribute_path(path).map_err(|e| PatchError::from_path(path, e))?;
                match rt.resolve(&parsed) {
                    Ok(resolved) => resolved,
                    Err(ResolveError::UnknownAttribute(name)) if self.ignore_unknown_attribute => {
                        tracing::warn!(attribute = %name, path, "Ignoring unknown attribute");
                        return Ok(Vec::new());
                    }
                    Err(e) => return Err(PatchError::from_resolve(path, e)),
                }
            }
        };

        let resolved = match resolved {
            Resolved::Extension(index) => {
                return match (&operation.value, op) {
                    (_, PatchOpKind::Remove) | (None | Some(Value::Null), _) => {
                        Ok(vec![AtomicOperation::RemoveExtensionRef(
                            RemoveExtensionRefOperation { extension: index },
                        )])
                    }
                    (Some(Value::Object(value)), _) => {
                        Ok(collect(self.decomposer().extension(op, index, value)?, errors))
                    }
                    (Some(_), _) => Err(PatchError::MalformedResource(format!(
                        "Extension '{}' must be a JSON object",
                        rt.extensions()[index].id
                    ))),
                };
            }
            Resolved::Attribute(resolved) => resolved,
        };

        let definition = rt.attribute(resolved.attribute);
        let read_only = definition.is_read_only()
            || resolved
                .parent
                .is_some_and(|parent| rt.attribute(parent).is_read_only());
        if read_only {
            return Err(PatchError::Mutability(format!(
                "Attribute '{}' is readOnly and cannot be modified",
                definition.full_name
            )));
        }

        if definition.is_complex()
            && !definition.multi_valued
            && op != PatchOpKind::Remove
            && let Some(Value::Object(value)) = &operation.value
        {
            return Ok(collect(
                self.decomposer().complex(op, resolved.attribute, value)?,
                errors,
            ));
        }

        match classify(rt, op, resolved, operation.value.clone(), path) {
            Ok(atomic) => Ok(vec![atomic]),
            Err(PatchError::Validation(found)) => {
                errors.merge(found);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Offer `operation` to the workarounds, then to the handler.
    fn execute(
        &self,
        ctx: &mut ApplyContext<'_>,
        mut operation: AtomicOperation,
    ) -> Result<(), PatchError> {
        for workaround in &self.workarounds {
            match workaround.intercept(ctx, operation)? {
                WorkaroundOutcome::Continue(next) => operation = next,
                WorkaroundOutcome::Handled => {
                    tracing::debug!(workaround = workaround.name(), "Operation handled by workaround");
                    return Ok(());
                }
            }
        }

        tracing::debug!(kind = operation.kind(), "Dispatching atomic operation");
        match dispatch(&self.handler, ctx, &operation) {
            Err(PatchError::Validation(found)) => {
                ctx.errors.merge(found);
                Ok(())
            }
            other => other,
        }
    }
}

fn collect(decomposition: Decomposition, errors: &mut FieldErrors) -> Vec<AtomicOperation> {
    errors.merge(decomposition.errors);
    decomposition.operations
}
