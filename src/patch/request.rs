//! PATCH request envelope parsing.
//!
//! Decodes the `urn:ietf:params:scim:api:messages:2.0:PatchOp` message body
//! into typed [`PatchOperation`]s. Paths are parsed eagerly, so a
//! [`PatchOperation`] is immutable once built and is consumed exactly once by
//! the engine.

use super::path::PathExpression;
use crate::error::{PatchError, PatchResult};

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Schema URI of the PATCH request envelope.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// The three PATCH operation verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

impl PatchOp {
    /// Parse the verb case-insensitively, as clients spell it both ways.
    pub fn parse(op: &str) -> Option<Self> {
        match op.to_ascii_lowercase().as_str() {
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed PATCH operation.
///
/// `path` is `None` when the operation applies to the resource root (an
/// omitted or whitespace-only path string). `value` is `Null` for remove
/// operations.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: Option<PathExpression>,
    pub value: Value,
}

/// A decoded PATCH request body.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub operations: Vec<PatchOperation>,
}

#[derive(Deserialize)]
struct RawPatchRequest {
    schemas: Vec<String>,
    #[serde(rename = "Operations")]
    operations: Vec<RawOperation>,
}

#[derive(Deserialize)]
struct RawOperation {
    op: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

impl PatchRequest {
    /// Decode a request body.
    ///
    /// Structural problems (missing envelope fields, wrong message schema,
    /// unknown verb, missing value) are `invalidSyntax`; a path string that
    /// fails to parse is `invalidPath` carrying the offending operation's
    /// index.
    pub fn from_json(body: Value) -> PatchResult<Self> {
        let raw: RawPatchRequest = serde_json::from_value(body)
            .map_err(|e| PatchError::invalid_syntax(0, format!("malformed PatchOp body: {e}")))?;

        if !raw
            .schemas
            .iter()
            .any(|uri| uri.eq_ignore_ascii_case(PATCH_OP_SCHEMA))
        {
            return Err(PatchError::invalid_syntax(
                0,
                format!("request is missing the '{PATCH_OP_SCHEMA}' schema"),
            ));
        }

        let mut operations = Vec::with_capacity(raw.operations.len());
        for (index, raw_op) in raw.operations.into_iter().enumerate() {
            operations.push(Self::decode_operation(raw_op, index)?);
        }
        Ok(Self { operations })
    }

    fn decode_operation(raw: RawOperation, index: usize) -> PatchResult<PatchOperation> {
        let op = PatchOp::parse(&raw.op).ok_or_else(|| {
            PatchError::invalid_syntax(index, format!("unsupported PATCH operation '{}'", raw.op))
        })?;

        let path = match raw.path.as_deref() {
            Some(raw_path) if !raw_path.trim().is_empty() => {
                let parsed = PathExpression::parse(raw_path).map_err(|e| {
                    PatchError::invalid_path(index, e.to_string()).with_path(raw_path)
                })?;
                Some(parsed)
            }
            // An omitted or blank path means "apply to the resource root".
            _ => None,
        };

        let value = match op {
            PatchOp::Remove => raw.value.unwrap_or(Value::Null),
            PatchOp::Add | PatchOp::Replace => raw.value.ok_or_else(|| {
                PatchError::invalid_syntax(index, format!("{op} operation requires a value"))
            })?,
        };

        Ok(PatchOperation { op, path, value })
    }
}
