//! PATCH errors and field-level validation messages.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::request::PatchOpKind;
use crate::scim::{
    error::ScimErrorType, path::PathParseError, schema::ResolveError, types::SCHEMA_PATCH_OP,
};

/// Validation messages keyed by attribute full name.
///
/// Both the attribute keys and each attribute's messages keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Append every message of `other`, keeping its order.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn into_inner(self) -> IndexMap<String, Vec<String>> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "{}: {}", field, message)?;
            }
        }
        Ok(())
    }
}

/// PATCH operation errors.
///
/// Everything except [`PatchError::Validation`] aborts the request at once;
/// validation messages are collected across all operations first.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchError {
    #[error("Request must include the PatchOp schema '{}'", SCHEMA_PATCH_OP)]
    InvalidSchema,

    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("Invalid value filter in path '{path}': {message}")]
    InvalidFilter { path: String, message: String },

    #[error("Attribute '{0}' is unknown")]
    UnknownAttribute(String),

    #[error("{0}")]
    NoTarget(String),

    #[error("{0}")]
    Mutability(String),

    #[error("{0}")]
    MalformedResource(String),

    #[error("Operation '{0}' requires a value")]
    MissingValue(PatchOpKind),

    #[error("Operation 'remove' requires a path")]
    MissingPath,

    #[error("The patch request failed validation: {0}")]
    Validation(FieldErrors),

    #[error("Invalid operation at index {index}: {error}")]
    InvalidOperation {
        index: usize,
        error: Box<PatchError>,
    },
}

impl PatchError {
    /// The RFC 7644 `scimType` this error is reported with.
    pub fn scim_type(&self) -> ScimErrorType {
        match self {
            PatchError::InvalidSchema | PatchError::MalformedResource(_) => {
                ScimErrorType::InvalidSyntax
            }
            PatchError::InvalidPath { .. } | PatchError::UnknownAttribute(_) => {
                ScimErrorType::InvalidPath
            }
            PatchError::InvalidFilter { .. } => ScimErrorType::InvalidFilter,
            PatchError::NoTarget(_) | PatchError::MissingPath => ScimErrorType::NoTarget,
            PatchError::Mutability(_) => ScimErrorType::Mutability,
            PatchError::MissingValue(_) | PatchError::Validation(_) => ScimErrorType::InvalidValue,
            PatchError::InvalidOperation { error, .. } => error.scim_type(),
        }
    }

    /// Field-level messages, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            PatchError::Validation(errors) => Some(errors),
            PatchError::InvalidOperation { error, .. } => error.field_errors(),
            _ => None,
        }
    }

    pub(crate) fn from_path(path: &str, error: PathParseError) -> Self {
        match error {
            PathParseError::Filter(e) => PatchError::InvalidFilter {
                path: path.to_string(),
                message: e.to_string(),
            },
            other => PatchError::InvalidPath {
                path: path.to_string(),
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn from_resolve(path: &str, error: ResolveError) -> Self {
        match error {
            ResolveError::UnknownAttribute(name) => PatchError::UnknownAttribute(name),
            ResolveError::NotComplex(_) => PatchError::InvalidPath {
                path: path.to_string(),
                message: error.to_string(),
            },
            ResolveError::FilterNotAllowed(_) | ResolveError::UnknownFilterAttribute { .. } => {
                PatchError::InvalidFilter {
                    path: path.to_string(),
                    message: error.to_string(),
                }
            }
        }
    }
}
