//! Core SCIM resource representation.
//!
//! A [`Resource`] is the hybrid model the patch engine mutates: attributes
//! that have a schema descriptor live in a JSON map of validated shape, while
//! everything else (extension attributes keyed by schema URI, or attributes
//! of unregistered provenance) lives in the [`ExtensionContainer`]. The split
//! is schema-driven at construction time, so path resolution can decide
//! statically whether a segment addresses typed or dynamic data.

use super::extensions::ExtensionContainer;
use crate::error::{SchemaError, SchemaResult};
use crate::schema::SchemaRegistry;

use serde_json::{Map, Value};

/// Generic SCIM resource with schema-backed data and an extension container.
///
/// The resource is owned by the caller for the duration of a patch call and
/// mutated synchronously; the engine never retains a reference after
/// returning.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    resource_type: String,
    schemas: Vec<String>,
    data: Map<String, Value>,
    extensions: ExtensionContainer,
}

impl Resource {
    /// Build a resource from incoming JSON, splitting schema-backed
    /// attributes from extension data.
    ///
    /// Keys with a descriptor in the resource type's base schema go into the
    /// typed data map; everything else, including extension schema URIs,
    /// falls into the extension container.
    pub fn from_json(
        registry: &SchemaRegistry,
        resource_type: impl Into<String>,
        data: Value,
    ) -> SchemaResult<Self> {
        let resource_type = resource_type.into();
        let schema = registry.schema_for_type(&resource_type)?;

        let obj = match data {
            Value::Object(obj) => obj,
            other => {
                return Err(SchemaError::InvalidResource(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let mut schemas = Vec::new();
        let mut typed = Map::new();
        let mut extensions = ExtensionContainer::new();

        for (key, value) in obj {
            if key.eq_ignore_ascii_case("schemas") {
                if let Value::Array(uris) = value {
                    schemas = uris
                        .into_iter()
                        .filter_map(|uri| uri.as_str().map(str::to_string))
                        .collect();
                }
                continue;
            }
            if schema.attribute(&key).is_some() {
                typed.insert(key, value);
            } else {
                extensions.insert(key, value);
            }
        }

        if schemas.is_empty() {
            schemas.push(schema.id.clone());
        }

        Ok(Self {
            resource_type,
            schemas,
            data: typed,
            extensions,
        })
    }

    /// Reassemble the resource into its wire JSON form.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "schemas".to_string(),
            Value::Array(self.schemas.iter().cloned().map(Value::String).collect()),
        );
        for (key, value) in &self.data {
            obj.insert(key.clone(), value.clone());
        }
        for (key, value) in self.extensions.iter() {
            obj.insert(key.clone(), value.clone());
        }
        Value::Object(obj)
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    /// Schema-backed attribute data.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Mutable access to the schema-backed attribute data.
    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    pub fn extensions(&self) -> &ExtensionContainer {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut ExtensionContainer {
        &mut self.extensions
    }

    /// Look up a schema-backed attribute value by case-insensitive name.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        map_get(&self.data, name)
    }
}

/// Human-readable JSON type name for diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Case-insensitive accessors over JSON object maps. Resource data usually
// carries canonical attribute spellings, but clients may send any casing in
// both payloads and paths, so every structural hop goes through these.

pub(crate) fn map_key<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    map.keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .map(String::as_str)
}

pub(crate) fn map_get<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let key = map_key(map, name)?;
    map.get(key)
}

pub(crate) fn map_get_mut<'a>(map: &'a mut Map<String, Value>, name: &str) -> Option<&'a mut Value> {
    let key = map_key(map, name)?.to_string();
    map.get_mut(&key)
}

/// Insert keeping the spelling of an existing case-variant key, if any.
pub(crate) fn map_insert(map: &mut Map<String, Value>, name: &str, value: Value) {
    match map_key(map, name) {
        Some(existing) => {
            let existing = existing.to_string();
            map.insert(existing, value);
        }
        None => {
            map.insert(name.to_string(), value);
        }
    }
}

pub(crate) fn map_remove(map: &mut Map<String, Value>, name: &str) -> Option<Value> {
    let key = map_key(map, name)?.to_string();
    map.remove(&key)
}
