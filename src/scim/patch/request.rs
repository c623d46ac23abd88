//! PatchOp request envelope (RFC 7644 Section 3.5.2).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::PatchError;
use crate::scim::types::SCHEMA_PATCH_OP;

/// A SCIM PATCH request containing one or more operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRequest {
    /// SCIM schema URIs (must contain the PatchOp schema)
    pub schemas: Vec<String>,

    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![SCHEMA_PATCH_OP.to_string()],
            operations,
        }
    }

    /// Check the envelope and the shape of every operation.
    pub fn validate(&self) -> Result<(), PatchError> {
        if !self
            .schemas
            .iter()
            .any(|s| s.eq_ignore_ascii_case(SCHEMA_PATCH_OP))
        {
            return Err(PatchError::InvalidSchema);
        }

        for (index, operation) in self.operations.iter().enumerate() {
            operation
                .validate()
                .map_err(|e| PatchError::InvalidOperation {
                    index,
                    error: Box::new(e),
                })?;
        }

        Ok(())
    }
}

/// The `op` member. Deserializes case-insensitively (`Add`, `REPLACE`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Remove,
    Replace,
}

impl PatchOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchOpKind::Add => "add",
            PatchOpKind::Remove => "remove",
            PatchOpKind::Replace => "replace",
        }
    }
}

impl fmt::Display for PatchOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PatchOpKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "add" => Ok(PatchOpKind::Add),
            "remove" => Ok(PatchOpKind::Remove),
            "replace" => Ok(PatchOpKind::Replace),
            _ => Err(serde::de::Error::unknown_variant(
                &raw,
                &["add", "remove", "replace"],
            )),
        }
    }
}

/// A single SCIM PATCH operation.
///
/// An explicit JSON `null` value deserializes the same as an absent one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOpKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: Some(path.into()),
            value: None,
        }
    }

    /// A path-less operation carrying resource-shaped content.
    pub fn without_path(op: PatchOpKind, value: Value) -> Self {
        Self {
            op,
            path: None,
            value: Some(value),
        }
    }

    pub fn validate(&self) -> Result<(), PatchError> {
        let path = self.path.as_deref().map(str::trim).filter(|p| !p.is_empty());
        match (self.op, path) {
            (PatchOpKind::Remove, None) => Err(PatchError::MissingPath),
            (PatchOpKind::Add, _) if self.value.is_none() => {
                Err(PatchError::MissingValue(self.op))
            }
            (_, None) => match &self.value {
                Some(Value::Object(_)) => Ok(()),
                None => Err(PatchError::MissingValue(self.op)),
                Some(_) => Err(PatchError::MalformedResource(format!(
                    "Operation '{}' without a path requires an object value",
                    self.op
                ))),
            },
            _ => Ok(()),
        }
    }
}
