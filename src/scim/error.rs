//! SCIM 2.0 Error Types
//!
//! This module defines SCIM-specific error responses per RFC 7644 Section 3.12.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use super::{patch::PatchError, types::SCHEMA_ERROR};

/// SCIM error response per RFC 7644.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimErrorResponse {
    /// SCIM schema URIs (always contains the Error schema)
    pub schemas: Vec<String>,

    /// HTTP status code as a string (e.g., "400", "404")
    pub status: String,

    /// SCIM-specific error type (optional, per RFC 7644)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimErrorType>,

    /// Human-readable error detail
    pub detail: String,
}

impl ScimErrorResponse {
    fn new(
        status: StatusCode,
        scim_type: Option<ScimErrorType>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            schemas: vec![SCHEMA_ERROR.to_string()],
            status: status.as_u16().to_string(),
            scim_type,
            detail: detail.into(),
        }
    }

    /// Request body is not valid JSON or not a PatchOp message (400)
    pub fn invalid_syntax(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ScimErrorType::InvalidSyntax),
            detail,
        )
    }

    /// Resource type unknown to the server (404)
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, None, detail)
    }

    /// Internal server error (500)
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, None, detail)
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status.parse().unwrap_or(500))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&PatchError> for ScimErrorResponse {
    fn from(error: &PatchError) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(error.scim_type()),
            error.to_string(),
        )
    }
}

impl From<PatchError> for ScimErrorResponse {
    fn from(error: PatchError) -> Self {
        Self::from(&error)
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for ScimErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (status, axum::Json(self)).into_response()
    }
}

/// SCIM error types per RFC 7644 Section 3.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    /// Filter syntax is invalid or names unknown sub-attributes
    InvalidFilter,

    /// Request body is not a valid PatchOp message
    InvalidSyntax,

    /// Path is malformed or names an unknown attribute
    InvalidPath,

    /// Path or filter selected nothing to operate on
    NoTarget,

    /// Attempt to modify read-only or immutable attribute
    Mutability,

    /// Attribute value is invalid for its type
    InvalidValue,
}

impl std::fmt::Display for ScimErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScimErrorType::InvalidFilter => write!(f, "invalidFilter"),
            ScimErrorType::InvalidSyntax => write!(f, "invalidSyntax"),
            ScimErrorType::InvalidPath => write!(f, "invalidPath"),
            ScimErrorType::NoTarget => write!(f, "noTarget"),
            ScimErrorType::Mutability => write!(f, "mutability"),
            ScimErrorType::InvalidValue => write!(f, "invalidValue"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scim::patch::FieldErrors;

    #[test]
    fn test_from_no_target() {
        let err = ScimErrorResponse::from(PatchError::NoTarget(
            "Cannot apply patch operation 'add' on path 'emails[type eq \"x\"]': no matching object was found".to_string(),
        ));

        assert_eq!(err.status, "400");
        assert_eq!(err.scim_type, Some(ScimErrorType::NoTarget));
        assert!(err.detail.contains("no matching object was found"));

        let json = serde_json::to_string_pretty(&err).unwrap();
        assert!(json.contains("\"scimType\": \"noTarget\""));
        assert!(json.contains(SCHEMA_ERROR));
    }

    #[test]
    fn test_from_validation_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.push("urn:test:Thing:number", "bad number");
        let err = ScimErrorResponse::from(&PatchError::Validation(errors));

        assert_eq!(err.scim_type, Some(ScimErrorType::InvalidValue));
        assert!(err.detail.contains("urn:test:Thing:number: bad number"));
    }

    #[test]
    fn test_not_found_omits_scim_type() {
        let err = ScimErrorResponse::not_found("Resource type 'Device' is not registered");

        assert_eq!(err.status, "404");
        let json = serde_json::to_string_pretty(&err).unwrap();
        assert!(!json.contains("scimType"));
    }

    #[test]
    fn test_scim_error_status_code() {
        assert_eq!(
            ScimErrorResponse::invalid_syntax("test").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScimErrorResponse::not_found("test").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ScimErrorResponse::internal("test").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_scim_error_type_display() {
        assert_eq!(format!("{}", ScimErrorType::InvalidFilter), "invalidFilter");
        assert_eq!(format!("{}", ScimErrorType::InvalidPath), "invalidPath");
        assert_eq!(format!("{}", ScimErrorType::NoTarget), "noTarget");
    }
}
