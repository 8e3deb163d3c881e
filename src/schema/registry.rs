//! Schema registry for loading, managing, and accessing SCIM schemas.
//!
//! The registry owns the embedded core schemas and any dynamically registered
//! extension schemas, and hands out per-resource-type attribute tables that
//! the patch resolver walks.

use super::embedded;
use super::types::{AttributeDefinition, Schema};
use crate::error::{SchemaError, SchemaResult};

use std::collections::HashMap;

/// Registry for SCIM schemas.
///
/// Holds the core User and Group schemas plus registered extension schemas,
/// keyed by schema URI. Extension schemas describe attributes that are not
/// backed by a static property on the core resource; their values live in the
/// resource's extension container.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    core_user_schema: Schema,
    core_group_schema: Schema,
    schemas: HashMap<String, Schema>,
    extension_uris: Vec<String>,
}

impl SchemaRegistry {
    /// Create a registry with the embedded core schemas and the enterprise
    /// User extension.
    pub fn new() -> SchemaResult<Self> {
        let core_user_schema: Schema = serde_json::from_str(embedded::core_user_schema())?;
        let core_group_schema: Schema = serde_json::from_str(embedded::core_group_schema())?;
        let enterprise: Schema = serde_json::from_str(embedded::enterprise_user_schema())?;

        let mut schemas = HashMap::new();
        schemas.insert(core_user_schema.id.clone(), core_user_schema.clone());
        schemas.insert(core_group_schema.id.clone(), core_group_schema.clone());

        let mut registry = Self {
            core_user_schema,
            core_group_schema,
            schemas,
            extension_uris: Vec::new(),
        };
        registry.register_extension(enterprise)?;
        Ok(registry)
    }

    /// Register an extension schema.
    ///
    /// Extension attributes are addressed through the resource's extension
    /// container during PATCH; registering the schema makes the URI known so
    /// incoming resource JSON can be split into core and extension data.
    pub fn register_extension(&mut self, schema: Schema) -> SchemaResult<()> {
        if self.schemas.contains_key(&schema.id) {
            return Err(SchemaError::DuplicateSchema(schema.id));
        }
        self.extension_uris.push(schema.id.clone());
        self.schemas.insert(schema.id.clone(), schema);
        Ok(())
    }

    /// Get the core User schema.
    pub fn user_schema(&self) -> &Schema {
        &self.core_user_schema
    }

    /// Get the core Group schema.
    pub fn group_schema(&self) -> &Schema {
        &self.core_group_schema
    }

    /// Get a schema by its URI.
    pub fn schema_by_id(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }

    /// URIs of all registered extension schemas.
    pub fn extension_uris(&self) -> &[String] {
        &self.extension_uris
    }

    /// Whether the given key names a registered extension schema URI.
    ///
    /// Comparison is case-insensitive, matching attribute-name semantics.
    pub fn is_extension_uri(&self, key: &str) -> bool {
        self.extension_uris
            .iter()
            .any(|uri| uri.eq_ignore_ascii_case(key))
    }

    /// The base schema for a resource type.
    pub fn schema_for_type(&self, resource_type: &str) -> SchemaResult<&Schema> {
        match resource_type {
            "User" => Ok(&self.core_user_schema),
            "Group" => Ok(&self.core_group_schema),
            other => Err(SchemaError::UnknownResourceType(other.to_string())),
        }
    }

    /// The top-level attribute table for a resource type, for path resolution.
    pub fn attributes_for_type(&self, resource_type: &str) -> SchemaResult<&[AttributeDefinition]> {
        Ok(&self.schema_for_type(resource_type)?.attributes)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new().expect("embedded schemas are valid")
    }
}
