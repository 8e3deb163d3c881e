//! Capability-based access to a resource's declared attributes.
//!
//! A [`PropertyResolver`] maps attribute names (case-insensitively) onto
//! [`PropertyDescriptor`]s built from schema metadata: declared type,
//! multi-valuedness, readability and writability flags, plus get/set
//! accessors over the owning JSON map. Descriptor tables are registry-built —
//! there is no runtime type introspection anywhere in resolution.

use crate::error::SchemaResult;
use crate::resource::{map_get, map_insert, map_remove};
use crate::schema::{AttributeDefinition, AttributeType, SchemaRegistry};

use serde_json::{Map, Value};

/// Resolves attribute names against a declared attribute table.
///
/// The table is either a schema's top-level attributes or, after a hop into a
/// complex attribute, that attribute's sub-attribute table.
#[derive(Debug, Clone, Copy)]
pub struct PropertyResolver<'a> {
    attributes: &'a [AttributeDefinition],
}

impl<'a> PropertyResolver<'a> {
    /// Resolver over an explicit attribute table.
    pub fn new(attributes: &'a [AttributeDefinition]) -> Self {
        Self { attributes }
    }

    /// Resolver over the top-level attributes of a resource type.
    pub fn for_resource_type(
        registry: &'a SchemaRegistry,
        resource_type: &str,
    ) -> SchemaResult<Self> {
        Ok(Self::new(registry.attributes_for_type(resource_type)?))
    }

    /// Resolve an attribute name, case-insensitively.
    ///
    /// Returns `None` when no declared attribute matches; the caller decides
    /// whether to fall through to the extension container.
    pub fn resolve(&self, name: &str) -> Option<PropertyDescriptor<'a>> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
            .map(PropertyDescriptor::new)
    }
}

/// Capability view of one declared attribute.
///
/// Wraps the schema definition and exposes exactly what patch application
/// needs: type and cardinality, mutability checks, and accessors that read or
/// write the attribute on an owning JSON object under its canonical name.
#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor<'a> {
    definition: &'a AttributeDefinition,
}

impl<'a> PropertyDescriptor<'a> {
    pub fn new(definition: &'a AttributeDefinition) -> Self {
        Self { definition }
    }

    /// Canonical attribute name as declared in the schema.
    pub fn name(&self) -> &'a str {
        &self.definition.name
    }

    pub fn definition(&self) -> &'a AttributeDefinition {
        self.definition
    }

    /// Declared type; for multi-valued attributes this is the element type.
    pub fn data_type(&self) -> AttributeType {
        self.definition.data_type
    }

    pub fn is_multi_valued(&self) -> bool {
        self.definition.multi_valued
    }

    pub fn is_required(&self) -> bool {
        self.definition.required
    }

    /// Whether the engine may read the current value.
    pub fn is_readable(&self) -> bool {
        self.definition.is_readable()
    }

    /// Whether a PATCH may write the attribute given its current presence.
    pub fn is_writable(&self, has_current_value: bool) -> bool {
        self.definition.is_writable(has_current_value)
    }

    /// Resolver over the element (or complex value) sub-attribute table.
    pub fn element_resolver(&self) -> PropertyResolver<'a> {
        PropertyResolver::new(&self.definition.sub_attributes)
    }

    /// Resolve a sub-attribute of this attribute's element type.
    pub fn sub_descriptor(&self, name: &str) -> Option<PropertyDescriptor<'a>> {
        self.element_resolver().resolve(name)
    }

    /// Read the attribute off its owner, matching stored keys
    /// case-insensitively.
    pub fn get<'v>(&self, owner: &'v Map<String, Value>) -> Option<&'v Value> {
        map_get(owner, self.name())
    }

    /// Write the attribute on its owner, preserving an existing key spelling
    /// when one is present.
    pub fn set(&self, owner: &mut Map<String, Value>, value: Value) {
        map_insert(owner, self.name(), value);
    }

    /// Remove the attribute from its owner, returning the previous value.
    pub fn remove(&self, owner: &mut Map<String, Value>) -> Option<Value> {
        map_remove(owner, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new().unwrap()
    }

    #[test]
    fn test_resolution_is_case_insensitive() {
        let registry = registry();
        let resolver = PropertyResolver::for_resource_type(&registry, "User").unwrap();
        let descriptor = resolver.resolve("USERNAME").unwrap();
        assert_eq!(descriptor.name(), "userName");
        assert!(resolver.resolve("noSuchAttribute").is_none());
    }

    #[test]
    fn test_element_resolution() {
        let registry = registry();
        let resolver = PropertyResolver::for_resource_type(&registry, "User").unwrap();
        let emails = resolver.resolve("emails").unwrap();
        assert!(emails.is_multi_valued());
        let value = emails.sub_descriptor("Value").unwrap();
        assert_eq!(value.data_type(), AttributeType::String);
        assert!(emails.sub_descriptor("region").is_none());
    }

    #[test]
    fn test_accessors_use_canonical_name() {
        let registry = registry();
        let resolver = PropertyResolver::for_resource_type(&registry, "User").unwrap();
        let descriptor = resolver.resolve("displayname").unwrap();

        let mut owner = Map::new();
        descriptor.set(&mut owner, json!("Barbara Jensen"));
        assert_eq!(owner.get("displayName"), Some(&json!("Barbara Jensen")));
        assert_eq!(descriptor.get(&owner), Some(&json!("Barbara Jensen")));
        assert_eq!(descriptor.remove(&mut owner), Some(json!("Barbara Jensen")));
        assert!(owner.is_empty());
    }

    #[test]
    fn test_id_is_not_writable() {
        let registry = registry();
        let resolver = PropertyResolver::for_resource_type(&registry, "User").unwrap();
        let id = resolver.resolve("id").unwrap();
        assert!(!id.is_writable(false));
        assert!(!id.is_writable(true));
    }
}
