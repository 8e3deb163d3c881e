//! Extension container for attributes not backed by a schema descriptor.
//!
//! SCIM resources may carry attributes contributed by schema extensions that
//! are not modeled as native typed properties. Those values live in a generic
//! case-insensitive key/value store beside the strongly-typed resource data,
//! and path resolution falls through to this container when no descriptor
//! matches.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Case-insensitive key/value store for extension attributes.
///
/// Keys keep the spelling they were first inserted with; lookups, overwrites,
/// and removals match keys with ordinal case-insensitive comparison, the same
/// convention used for schema attribute names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionContainer {
    entries: Map<String, Value>,
}

impl ExtensionContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored key matching `key` case-insensitively, if any.
    pub fn key_of(&self, key: &str) -> Option<&str> {
        self.entries
            .keys()
            .find(|stored| stored.eq_ignore_ascii_case(key))
            .map(String::as_str)
    }

    /// Look up a value by case-insensitive key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let stored = self.key_of(key)?;
        self.entries.get(stored)
    }

    /// Mutable lookup by case-insensitive key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let stored = self.key_of(key)?.to_string();
        self.entries.get_mut(&stored)
    }

    /// Insert a value, overwriting any entry whose key matches
    /// case-insensitively. The original key spelling is kept on overwrite.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.key_of(&key) {
            Some(stored) => {
                let stored = stored.to_string();
                self.entries.insert(stored, value);
            }
            None => {
                self.entries.insert(key, value);
            }
        }
    }

    /// Remove an entry by case-insensitive key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let stored = self.key_of(key)?.to_string();
        self.entries.remove(&stored)
    }

    /// Whether an entry exists for the case-insensitive key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.key_of(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

impl From<Map<String, Value>> for ExtensionContainer {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut container = ExtensionContainer::new();
        container.insert("costCenter", json!("4130"));
        assert_eq!(container.get("costcenter"), Some(&json!("4130")));
        assert_eq!(container.get("COSTCENTER"), Some(&json!("4130")));
        assert!(container.get("cost_center").is_none());
    }

    #[test]
    fn test_overwrite_keeps_original_spelling() {
        let mut container = ExtensionContainer::new();
        container.insert("costCenter", json!("4130"));
        container.insert("COSTCENTER", json!("5012"));
        assert_eq!(container.len(), 1);
        assert_eq!(container.key_of("costcenter"), Some("costCenter"));
        assert_eq!(container.get("costCenter"), Some(&json!("5012")));
    }

    #[test]
    fn test_remove_by_any_case() {
        let mut container = ExtensionContainer::new();
        container.insert("department", json!("Tooling"));
        assert_eq!(container.remove("DEPARTMENT"), Some(json!("Tooling")));
        assert!(container.is_empty());
    }
}
