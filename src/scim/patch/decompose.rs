//! Splits resource-shaped values into atomic operations.
//!
//! Used for path-less operations and for object values aimed at a single
//! complex attribute or a whole extension. Each present attribute becomes the
//! operation the classifier builds for the equivalent explicit path; a `null`
//! member clears its attribute. Read-only attributes are skipped.

use serde_json::{Map, Value};

use super::{
    FieldErrors, PatchError, PatchOpKind,
    operation::{AtomicOperation, RemoveComplexAttributeOperation, RemoveExtensionRefOperation, classify},
};
use crate::scim::{
    path::parse_attribute_path,
    schema::{AttrId, ResourceType, Resolved, ResolvedAttribute, SchemaRef},
    types::SCHEMAS_KEY,
};

/// Operations synthesized from one value, plus type errors met on the way.
#[derive(Debug, Default)]
pub struct Decomposition {
    pub operations: Vec<AtomicOperation>,
    pub errors: FieldErrors,
}

pub struct Decomposer<'a> {
    resource_type: &'a ResourceType,
    ignore_unknown_attribute: bool,
    /// Accept `urn:...:User:attribute` keys at the resource level
    qualified_keys: bool,
}

impl<'a> Decomposer<'a> {
    pub fn new(resource_type: &'a ResourceType) -> Self {
        Self {
            resource_type,
            ignore_unknown_attribute: false,
            qualified_keys: false,
        }
    }

    pub fn ignore_unknown_attribute(mut self, ignore: bool) -> Self {
        self.ignore_unknown_attribute = ignore;
        self
    }

    pub fn qualified_keys(mut self, accept: bool) -> Self {
        self.qualified_keys = accept;
        self
    }

    /// Decompose a whole-resource value.
    pub fn resource(
        &self,
        op: PatchOpKind,
        value: &Map<String, Value>,
    ) -> Result<Decomposition, PatchError> {
        let mut out = Decomposition::default();
        self.schema(op, SchemaRef::Main, value, &mut out)?;
        Ok(out)
    }

    /// Decompose the content of one extension schema.
    pub fn extension(
        &self,
        op: PatchOpKind,
        extension: usize,
        value: &Map<String, Value>,
    ) -> Result<Decomposition, PatchError> {
        let mut out = Decomposition::default();
        self.schema(op, SchemaRef::Extension(extension), value, &mut out)?;
        Ok(out)
    }

    /// Decompose an object value for a single-valued complex attribute.
    pub fn complex(
        &self,
        op: PatchOpKind,
        attribute: AttrId,
        value: &Map<String, Value>,
    ) -> Result<Decomposition, PatchError> {
        let mut out = Decomposition::default();
        self.complex_members(op, attribute, value, &mut out)?;
        Ok(out)
    }

    fn schema(
        &self,
        op: PatchOpKind,
        schema: SchemaRef,
        value: &Map<String, Value>,
        out: &mut Decomposition,
    ) -> Result<(), PatchError> {
        let rt = self.resource_type;
        for (key, member) in value {
            if schema == SchemaRef::Main {
                if key.eq_ignore_ascii_case(SCHEMAS_KEY) {
                    continue;
                }
                if let Some(index) = rt.extension_by_uri(key) {
                    self.extension_member(op, index, key, member, out)?;
                    continue;
                }
            }

            if let Some(attribute) = rt.find_attribute(schema, key) {
                self.attribute(op, attribute, member, out)?;
            } else if schema == SchemaRef::Main && self.qualified_keys && key.contains(':') {
                self.qualified(op, key, member, out)?;
            } else {
                self.unknown(format!("{}:{}", rt.schema_of(schema).id, key))?;
            }
        }
        Ok(())
    }

    fn extension_member(
        &self,
        op: PatchOpKind,
        index: usize,
        key: &str,
        member: &Value,
        out: &mut Decomposition,
    ) -> Result<(), PatchError> {
        match member {
            Value::Null => {
                out.operations.push(AtomicOperation::RemoveExtensionRef(
                    RemoveExtensionRefOperation { extension: index },
                ));
                Ok(())
            }
            Value::Object(content) => {
                self.schema(op, SchemaRef::Extension(index), content, out)
            }
            _ => Err(PatchError::MalformedResource(format!(
                "Extension '{}' must be a JSON object",
                key
            ))),
        }
    }

    /// A fully-qualified key such as `urn:...:enterprise:2.0:User:employeeNumber`.
    fn qualified(
        &self,
        op: PatchOpKind,
        key: &str,
        member: &Value,
        out: &mut Decomposition,
    ) -> Result<(), PatchError> {
        let resolved = match self.resource_type.extension_by_uri(key) {
            Some(index) => Some(Resolved::Extension(index)),
            None => parse_attribute_path(key)
                .ok()
                .and_then(|path| self.resource_type.resolve(&path).ok()),
        };
        match resolved {
            Some(Resolved::Attribute(resolved)) if resolved.filter.is_none() => {
                match resolved.parent {
                    Some(parent) => self.member(op, parent, resolved.attribute, member, out),
                    None => self.attribute(op, resolved.attribute, member, out),
                }
            }
            Some(Resolved::Extension(index)) => {
                self.extension_member(op, index, key, member, out)
            }
            _ => self.unknown(key.to_string()),
        }
    }

    fn unknown(&self, full_name: String) -> Result<(), PatchError> {
        if self.ignore_unknown_attribute {
            tracing::warn!(attribute = %full_name, "Ignoring unknown attribute");
            Ok(())
        } else {
            Err(PatchError::UnknownAttribute(full_name))
        }
    }

    fn attribute(
        &self,
        op: PatchOpKind,
        attribute: AttrId,
        value: &Value,
        out: &mut Decomposition,
    ) -> Result<(), PatchError> {
        let definition = self.resource_type.attribute(attribute);
        if definition.is_read_only() {
            tracing::debug!(attribute = %definition.full_name, "Skipping read-only attribute");
            return Ok(());
        }

        if definition.is_complex()
            && !definition.multi_valued
            && let Value::Object(members) = value
        {
            return self.complex_members(op, attribute, members, out);
        }

        self.push(
            op,
            ResolvedAttribute {
                attribute,
                parent: None,
                filter: None,
            },
            value,
            out,
        )
    }

    fn complex_members(
        &self,
        op: PatchOpKind,
        attribute: AttrId,
        members: &Map<String, Value>,
        out: &mut Decomposition,
    ) -> Result<(), PatchError> {
        if members.is_empty() {
            if op == PatchOpKind::Replace {
                out.operations.push(AtomicOperation::RemoveComplex(
                    RemoveComplexAttributeOperation { attribute },
                ));
            }
            return Ok(());
        }

        let rt = self.resource_type;
        for (key, member) in members {
            match rt.find_sub_attribute(attribute, key) {
                Some(sub) => self.member(op, attribute, sub, member, out)?,
                None => self.unknown(format!("{}.{}", rt.attribute(attribute).full_name, key))?,
            }
        }
        Ok(())
    }

    fn member(
        &self,
        op: PatchOpKind,
        parent: AttrId,
        sub: AttrId,
        value: &Value,
        out: &mut Decomposition,
    ) -> Result<(), PatchError> {
        let definition = self.resource_type.attribute(sub);
        if definition.is_read_only() {
            tracing::debug!(attribute = %definition.full_name, "Skipping read-only attribute");
            return Ok(());
        }
        self.push(
            op,
            ResolvedAttribute {
                attribute: sub,
                parent: Some(parent),
                filter: None,
            },
            value,
            out,
        )
    }

    fn push(
        &self,
        op: PatchOpKind,
        resolved: ResolvedAttribute,
        value: &Value,
        out: &mut Decomposition,
    ) -> Result<(), PatchError> {
        let rt = self.resource_type;
        let path = rt.attribute(resolved.attribute).full_name.clone();
        // An explicit null clears the attribute whatever the operation.
        let (op, value) = match value {
            Value::Null => (PatchOpKind::Remove, None),
            other => (op, Some(other.clone())),
        };
        match classify(rt, op, resolved, value, &path) {
            Ok(operation) => {
                out.operations.push(operation);
                Ok(())
            }
            Err(PatchError::Validation(errors)) => {
                out.errors.merge(errors);
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}
