//! Error types for SCIM PATCH processing.
//!
//! This module provides the protocol-facing error taxonomy for PATCH
//! operations, following Rust's error handling best practices with detailed
//! error information. Resolution and conversion failures are always returned
//! as values; nothing in the engine panics on malformed client input.

use serde::{Deserialize, Serialize};

/// Schema URI of the SCIM error response envelope.
pub const ERROR_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Protocol error categories for PATCH processing.
///
/// Each variant corresponds to a `scimType` value from RFC 7644 Section 3.12.
/// `Mutability` is the odd one out: attempting to write a non-writable
/// attribute (or read a non-readable one mid-operation) is treated as a
/// server-fault class rather than a client error, since the protocol does
/// not define a distinct 400-class response for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorKind {
    /// Malformed path grammar or malformed JSON request body
    InvalidSyntax,
    /// Well-formed path that does not address an attribute of the resource
    InvalidPath,
    /// Filter matched no element, or a removal target is absent
    NoTarget,
    /// Value cannot be converted to the attribute's declared type
    InvalidValue,
    /// Attribute exists but is not writable (or readable) as the operation requires
    Mutability,
}

impl ScimErrorKind {
    /// The `scimType` string used in the error response envelope.
    pub fn scim_type(&self) -> &'static str {
        match self {
            Self::InvalidSyntax => "invalidSyntax",
            Self::InvalidPath => "invalidPath",
            Self::NoTarget => "noTarget",
            Self::InvalidValue => "invalidValue",
            Self::Mutability => "mutability",
        }
    }

    /// HTTP status code class for this error kind.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Mutability => 500,
            _ => 400,
        }
    }
}

impl std::fmt::Display for ScimErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scim_type())
    }
}

/// Error produced while parsing or applying a single PATCH operation.
///
/// Carries the zero-based index of the operation within the request batch
/// and, when the failure is tied to an attribute path, the raw path string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "operation {operation_index} ({kind}){at_path}: {detail}",
    at_path = .path.as_deref().map(|p| format!(" at path '{p}'")).unwrap_or_default()
)]
pub struct PatchError {
    /// Diagnostic category, mapped onto `scimType` at the boundary
    pub kind: ScimErrorKind,
    /// Raw path string of the failing operation, when one was given
    pub path: Option<String>,
    /// Zero-based index of the operation within the request batch
    pub operation_index: usize,
    /// Human-readable description of the failure
    pub detail: String,
}

impl PatchError {
    /// Create an error of the given kind for the operation at `index`.
    pub fn new(kind: ScimErrorKind, index: usize, detail: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            operation_index: index,
            detail: detail.into(),
        }
    }

    /// Attach the raw path string of the failing operation.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Create an `invalidSyntax` error.
    pub fn invalid_syntax(index: usize, detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::InvalidSyntax, index, detail)
    }

    /// Create an `invalidPath` error.
    pub fn invalid_path(index: usize, detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::InvalidPath, index, detail)
    }

    /// Create a `noTarget` error.
    pub fn no_target(index: usize, detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::NoTarget, index, detail)
    }

    /// Create an `invalidValue` error.
    pub fn invalid_value(index: usize, detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::InvalidValue, index, detail)
    }

    /// Create a `mutability` error.
    pub fn mutability(index: usize, detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::Mutability, index, detail)
    }
}

/// SCIM error response envelope as defined in RFC 7644 Section 3.12.
///
/// The engine itself never serializes responses; this type exists so a
/// transport layer can map a [`PatchError`] onto the wire format without
/// re-deriving the `scimType`/status classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub schemas: Vec<String>,
    pub status: String,
    #[serde(rename = "scimType", skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<String>,
    pub detail: String,
}

impl From<&PatchError> for ErrorResponse {
    fn from(error: &PatchError) -> Self {
        Self {
            schemas: vec![ERROR_RESPONSE_SCHEMA.to_string()],
            status: error.kind.http_status().to_string(),
            scim_type: Some(error.kind.scim_type().to_string()),
            detail: error.to_string(),
        }
    }
}

/// Errors that can occur while loading or registering schemas.
///
/// These are configuration-time errors and should surface during startup
/// rather than per-request.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Embedded or registered schema document failed to parse
    #[error("Failed to parse schema document: {0}")]
    Parse(#[from] serde_json::Error),

    /// No schema registered for the requested resource type
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// A schema with the same URI is already registered
    #[error("Duplicate schema URI: {0}")]
    DuplicateSchema(String),

    /// Resource payload is not structurally usable (e.g. not a JSON object)
    #[error("Invalid resource payload: {0}")]
    InvalidResource(String),
}

// Result type aliases for convenience
pub type PatchResult<T> = Result<T, PatchError>;
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(ScimErrorKind::InvalidPath.scim_type(), "invalidPath");
        assert_eq!(ScimErrorKind::NoTarget.http_status(), 400);
        assert_eq!(ScimErrorKind::Mutability.http_status(), 500);
    }

    #[test]
    fn test_error_message_includes_path() {
        let error = PatchError::invalid_path(2, "no such attribute").with_path("foo.bar");
        let rendered = error.to_string();
        assert!(rendered.contains("operation 2"));
        assert!(rendered.contains("foo.bar"));
        assert!(rendered.contains("invalidPath"));
    }

    #[test]
    fn test_error_response_envelope() {
        let error = PatchError::invalid_value(0, "expected a string");
        let response = ErrorResponse::from(&error);
        assert_eq!(response.schemas, vec![ERROR_RESPONSE_SCHEMA.to_string()]);
        assert_eq!(response.status, "400");
        assert_eq!(response.scim_type.as_deref(), Some("invalidValue"));
    }

    #[test]
    fn test_mutability_is_server_fault() {
        let error = PatchError::mutability(1, "attribute 'id' is read-only");
        let response = ErrorResponse::from(&error);
        assert_eq!(response.status, "500");
    }
}
