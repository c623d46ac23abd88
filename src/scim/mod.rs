//! SCIM 2.0 PATCH Implementation
//!
//! Applies RFC 7644 PATCH requests to SCIM resources held as JSON trees,
//! guided by RFC 7643 schema definitions.
//!
//! ## RFC References
//!
//! - RFC 7643: SCIM Core Schema
//! - RFC 7644: SCIM Protocol
//!
//! ## Module Structure
//!
//! - [`schema`]: Schema and resource type definitions, registry and path resolution
//! - [`path`]: Attribute path parser
//! - [`filter`]: SCIM filter expression parser
//! - [`evaluate`]: Filter evaluation against multivalued complex elements
//! - [`patch`]: Operation classification, appliers and the [`PatchEngine`]
//! - [`error`]: SCIM error responses per RFC 7644
//! - [`types`]: Well-known schema URIs

pub mod error;
pub mod evaluate;
pub mod filter;
pub mod patch;
pub mod path;
pub mod schema;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ScimErrorResponse, ScimErrorType};
pub use filter::{CompareOp, Filter, FilterParseError, FilterValue, parse_filter};
pub use patch::{
    AtomicOperation, FieldErrors, PatchEngine, PatchError, PatchOpKind, PatchOperation,
    PatchOutcome, PatchRequest,
};
pub use path::{AttributePath, PathParseError, PathSegment, parse_attribute_path};
pub use schema::{ResourceType, SchemaError, SchemaRegistry};
pub use types::*;
