//! Conversion of loosely-typed input values into declared attribute types.
//!
//! Conversion is a value round trip through the same serde machinery the rest
//! of the resource model uses at the protocol boundary: the incoming
//! `serde_json::Value` is deserialized into the strongly-typed Rust target
//! for the declared attribute type, then re-emitted as a normalized JSON
//! value. Any failure in either half surfaces as an `invalidValue` patch
//! error, never as a fault.

use crate::error::{PatchError, PatchResult};
use crate::resource::json_type_name;
use crate::schema::{AttributeDefinition, AttributeType};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

/// Convert `value` to the full declared shape of `definition`.
///
/// For multi-valued attributes the result is always an array: a sequence
/// input is converted element-wise, a single element is wrapped. For
/// single-valued attributes the result is the converted scalar or complex
/// value.
pub fn convert(
    definition: &AttributeDefinition,
    value: &Value,
    operation_index: usize,
) -> PatchResult<Value> {
    if definition.multi_valued {
        let elements = convert_elements(definition, value, operation_index)?;
        Ok(Value::Array(elements))
    } else {
        convert_single(definition, value, operation_index)
    }
}

/// Convert `value` into one or more elements of a multi-valued attribute.
///
/// Accepts either a single element or a sequence, expanding the sequence
/// into individually converted elements.
pub fn convert_elements(
    definition: &AttributeDefinition,
    value: &Value,
    operation_index: usize,
) -> PatchResult<Vec<Value>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| convert_single(definition, item, operation_index))
            .collect(),
        single => Ok(vec![convert_single(definition, single, operation_index)?]),
    }
}

/// Convert a single value (a scalar, complex value, or one collection
/// element) to the element type of `definition`.
pub fn convert_single(
    definition: &AttributeDefinition,
    value: &Value,
    operation_index: usize,
) -> PatchResult<Value> {
    let mismatch = || {
        PatchError::invalid_value(
            operation_index,
            format!(
                "attribute '{}' expects {}, got {}",
                definition.name,
                definition.data_type.name(),
                json_type_name(value)
            ),
        )
    };

    match definition.data_type {
        AttributeType::String => {
            let text: String = serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
            if !definition.canonical_values.is_empty()
                && !definition
                    .canonical_values
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(&text))
            {
                return Err(PatchError::invalid_value(
                    operation_index,
                    format!(
                        "attribute '{}' has invalid value '{}', allowed values: {:?}",
                        definition.name, text, definition.canonical_values
                    ),
                ));
            }
            Ok(Value::String(text))
        }
        AttributeType::Boolean => {
            let flag: bool = serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
            Ok(Value::Bool(flag))
        }
        AttributeType::Integer => {
            let number: i64 = serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
            Ok(Value::from(number))
        }
        AttributeType::Decimal => {
            let number: f64 = serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(mismatch)
        }
        AttributeType::DateTime => {
            let text: String = serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
            // chrono's RFC 3339 parser gives full semantic validation; the
            // stored form stays the client's original string.
            DateTime::<FixedOffset>::parse_from_rfc3339(&text).map_err(|_| {
                PatchError::invalid_value(
                    operation_index,
                    format!(
                        "attribute '{}' expects an RFC 3339 dateTime, got '{text}'",
                        definition.name
                    ),
                )
            })?;
            Ok(Value::String(text))
        }
        AttributeType::Binary => {
            let text: String = serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
            BASE64.decode(&text).map_err(|_| {
                PatchError::invalid_value(
                    operation_index,
                    format!(
                        "attribute '{}' expects base64-encoded data",
                        definition.name
                    ),
                )
            })?;
            Ok(Value::String(text))
        }
        AttributeType::Reference => {
            let text: String = serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
            let looks_like_reference =
                text.contains("://") || text.starts_with("urn:") || text.starts_with('/');
            if !looks_like_reference {
                return Err(PatchError::invalid_value(
                    operation_index,
                    format!(
                        "attribute '{}' expects a reference URI, got '{text}'",
                        definition.name
                    ),
                ));
            }
            Ok(Value::String(text))
        }
        AttributeType::Complex => {
            let Value::Object(fields) = value else {
                return Err(mismatch());
            };
            let mut converted = Map::new();
            for (key, field_value) in fields {
                let Some(sub) = definition.sub_attribute(key) else {
                    return Err(PatchError::invalid_value(
                        operation_index,
                        format!(
                            "attribute '{}' has no sub-attribute '{key}'",
                            definition.name
                        ),
                    ));
                };
                // Sub-attribute values land under their canonical spelling.
                converted.insert(sub.name.clone(), convert(sub, field_value, operation_index)?);
            }
            Ok(Value::Object(converted))
        }
    }
}
