//! SCIM resource model.
//!
//! Provides the hybrid resource representation the patch engine operates on:
//! schema-backed attribute data plus a case-insensitive extension container
//! for attributes without a static descriptor.

pub mod extensions;
pub mod resource;

pub use extensions::ExtensionContainer;
pub use resource::Resource;

pub(crate) use resource::{json_type_name, map_get, map_get_mut, map_insert, map_remove};
