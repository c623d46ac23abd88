//! Schema-driven SCIM 2.0 PATCH engine.
//!
//! ```no_run
//! use scim_patch::{
//!     config::PatchConfig,
//!     scim::{PatchEngine, PatchOperation, PatchRequest, SchemaRegistry},
//! };
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::with_core_schemas()?;
//! let users = registry.resource_type("User").ok_or("no User type")?;
//! let engine = PatchEngine::new(users, &PatchConfig::default());
//!
//! let outcome = engine.apply(
//!     &json!({"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "userName": "bjensen"}),
//!     &PatchRequest::new(vec![PatchOperation::replace("active", json!(false))]),
//! )?;
//! assert!(outcome.changed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
#[cfg(feature = "cli")]
pub mod observability;
pub mod scim;

pub use config::{ConfigError, PatchConfig, ScimPatchConfig};
pub use scim::{PatchEngine, PatchError, PatchOutcome, PatchRequest, SchemaRegistry};
