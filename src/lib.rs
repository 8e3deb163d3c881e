//! RFC 7644 PATCH engine for SCIM 2.0 resources.
//!
//! Provides type-safe partial updates over the SCIM resource model: a path
//! expression parser with filter predicates, schema-driven target resolution,
//! and an application engine with protocol-exact error diagnostics.
//!
//! # Core Components
//!
//! - [`PatchEngine`] - Applies add/remove/replace operations to a resource
//! - [`PatchRequest`] - Decoded `PatchOp` message envelope
//! - [`SchemaRegistry`] - Attribute metadata driving resolution and conversion
//! - [`Resource`] - Hybrid typed/extensible resource instance
//!
//! # Quick Start
//!
//! ```rust
//! use scim_patch::{ErrorPolicy, PatchEngine, PatchRequest, Resource, SchemaRegistry};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let mut user = Resource::from_json(&registry, "User", json!({
//!     "userName": "bjensen",
//!     "emails": [{"value": "bjensen@example.com", "type": "work"}]
//! }))?;
//!
//! let request = PatchRequest::from_json(json!({
//!     "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
//!     "Operations": [
//!         {"op": "replace", "path": "emails[type eq \"work\"].value",
//!          "value": "barbara@example.com"}
//!     ]
//! }))?;
//!
//! let engine = PatchEngine::with_policy(&registry, ErrorPolicy::FailFast);
//! engine.apply_request(&mut user, &request)?;
//! # Ok(())
//! # }
//! ```
//!
//! The engine is synchronous and performs no I/O. Callers serialize patch
//! application per resource instance and run their own business-rule
//! validation on the mutated resource before committing it.

pub mod error;
pub mod patch;
pub mod resource;
pub mod schema;

// Re-export commonly used types for convenience
pub use error::{ErrorResponse, PatchError, PatchResult, SchemaError, ScimErrorKind};
pub use patch::{
    ErrorPolicy, FilterClause, FilterOperator, PatchEngine, PatchOp, PatchOperation, PatchOutcome,
    PatchRequest, PathExpression, PathSegment, TreeAnalyzer,
};
pub use resource::{ExtensionContainer, Resource};
pub use schema::{AttributeDefinition, AttributeType, Mutability, Schema, SchemaRegistry};
