//! Schema definitions for SCIM resources.
//!
//! Implements the RFC 7643 attribute metadata model: schema documents,
//! attribute definitions with mutability and return characteristics, and the
//! registry that manages core and extension schemas.
//!
//! # Key Types
//!
//! - [`Schema`] - SCIM schema definition with attributes and metadata
//! - [`SchemaRegistry`] - Registry for managing and accessing schemas
//! - [`AttributeDefinition`] - Individual attribute specifications and constraints

pub mod embedded;
pub mod registry;
pub mod types;

pub use registry::SchemaRegistry;
pub use types::{AttributeDefinition, AttributeType, Mutability, Returned, Schema, Uniqueness};
