//! Core schema type definitions for SCIM resources.
//!
//! This module contains the data structures that define SCIM schemas and
//! attribute definitions as specified in RFC 7643, together with the
//! capability helpers (`is_readable`, `is_writable`, sub-attribute lookup)
//! the patch resolver is built on.

use serde::{Deserialize, Serialize};

/// A SCIM schema definition.
///
/// Represents a complete schema with its metadata and attribute definitions.
/// Each schema defines the structure and mutability rules for a specific
/// resource type like User or Group, or for a schema extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier (URI)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    /// Schema description
    #[serde(default)]
    pub description: String,
    /// List of attribute definitions
    pub attributes: Vec<AttributeDefinition>,
}

impl Schema {
    /// Find a top-level attribute by name, case-insensitively.
    ///
    /// SCIM attribute names are declared case-insensitive (RFC 7643 Section
    /// 2.1), so all lookups go through ordinal case-insensitive comparison.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }
}

/// Definition of a SCIM attribute.
///
/// Defines all characteristics of an attribute including type, constraints,
/// and mutability rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name
    pub name: String,
    /// Data type of the attribute
    #[serde(rename = "type")]
    pub data_type: AttributeType,
    /// Whether this attribute can have multiple values
    #[serde(rename = "multiValued")]
    pub multi_valued: bool,
    /// Whether this attribute is required
    #[serde(default)]
    pub required: bool,
    /// Whether string comparison is case-sensitive
    #[serde(rename = "caseExact", default)]
    pub case_exact: bool,
    /// Mutability characteristics
    #[serde(default)]
    pub mutability: Mutability,
    /// How the attribute is returned in responses
    #[serde(default)]
    pub returned: Returned,
    /// Uniqueness constraints
    #[serde(default)]
    pub uniqueness: Uniqueness,
    /// Allowed values for string attributes
    #[serde(rename = "canonicalValues", default)]
    pub canonical_values: Vec<String>,
    /// Sub-attributes for complex types (and for complex multi-valued elements)
    #[serde(rename = "subAttributes", default)]
    pub sub_attributes: Vec<AttributeDefinition>,
}

impl AttributeDefinition {
    /// Find a sub-attribute by name, case-insensitively.
    pub fn sub_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.sub_attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Whether a PATCH operation may write this attribute.
    ///
    /// Immutable attributes accept a value only while none is set; read-only
    /// attributes never accept one.
    pub fn is_writable(&self, has_current_value: bool) -> bool {
        match self.mutability {
            Mutability::ReadWrite | Mutability::WriteOnly => true,
            Mutability::Immutable => !has_current_value,
            Mutability::ReadOnly => false,
        }
    }

    /// Whether the engine may read the attribute's current value.
    ///
    /// Appending to a populated collection requires fetching its current
    /// contents, which `returned: never` attributes (passwords) disallow.
    pub fn is_readable(&self) -> bool {
        self.returned != Returned::Never
    }
}

impl Default for AttributeDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: AttributeType::String,
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            returned: Returned::Default,
            uniqueness: Uniqueness::None,
            canonical_values: Vec::new(),
            sub_attributes: Vec::new(),
        }
    }
}

/// SCIM attribute data types.
///
/// Represents the valid data types for SCIM attributes as defined in RFC 7643.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    /// String value
    String,
    /// Boolean value
    Boolean,
    /// Decimal number
    Decimal,
    /// Integer number
    Integer,
    /// DateTime in RFC3339 format
    DateTime,
    /// Binary data (base64 encoded)
    Binary,
    /// URI reference
    Reference,
    /// Complex attribute with sub-attributes
    Complex,
}

impl AttributeType {
    /// Human-readable type name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::DateTime => "dateTime",
            Self::Binary => "binary",
            Self::Reference => "reference",
            Self::Complex => "complex",
        }
    }
}

impl Default for AttributeType {
    fn default() -> Self {
        Self::String
    }
}

/// Attribute mutability characteristics.
///
/// Defines whether and how an attribute can be modified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Read-only attribute (managed by server)
    ReadOnly,
    /// Read-write attribute (can be modified by clients)
    ReadWrite,
    /// Immutable attribute (set once, never modified)
    Immutable,
    /// Write-only attribute (passwords, etc.)
    WriteOnly,
}

impl Default for Mutability {
    fn default() -> Self {
        Self::ReadWrite
    }
}

/// How an attribute is returned in responses.
///
/// `Never` doubles as the engine's readability flag: a value the server never
/// returns is also one the engine may not read back during patch application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    /// Always returned
    Always,
    /// Never returned (write-only data such as passwords)
    Never,
    /// Returned by default
    Default,
    /// Returned only when requested
    Request,
}

impl Default for Returned {
    fn default() -> Self {
        Self::Default
    }
}

/// Attribute uniqueness constraints.
///
/// Defines the scope of uniqueness for attribute values. Enforcement lives in
/// the caller's post-patch validator; the engine only carries the metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    /// No uniqueness constraint
    None,
    /// Unique within the server
    Server,
    /// Globally unique
    Global,
}

impl Default for Uniqueness {
    fn default() -> Self {
        Self::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_attr(name: &str, mutability: Mutability) -> AttributeDefinition {
        AttributeDefinition {
            name: name.to_string(),
            mutability,
            ..Default::default()
        }
    }

    #[test]
    fn test_case_insensitive_attribute_lookup() {
        let schema = Schema {
            id: "urn:example:Test".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            attributes: vec![string_attr("userName", Mutability::ReadWrite)],
        };
        assert!(schema.attribute("username").is_some());
        assert!(schema.attribute("USERNAME").is_some());
        assert!(schema.attribute("user_name").is_none());
    }

    #[test]
    fn test_writability_rules() {
        let read_write = string_attr("displayName", Mutability::ReadWrite);
        assert!(read_write.is_writable(true));

        let read_only = string_attr("id", Mutability::ReadOnly);
        assert!(!read_only.is_writable(false));

        let immutable = string_attr("externalId", Mutability::Immutable);
        assert!(immutable.is_writable(false));
        assert!(!immutable.is_writable(true));
    }

    #[test]
    fn test_returned_never_blocks_reads() {
        let password = AttributeDefinition {
            name: "password".to_string(),
            mutability: Mutability::WriteOnly,
            returned: Returned::Never,
            ..Default::default()
        };
        assert!(password.is_writable(true));
        assert!(!password.is_readable());
    }

    #[test]
    fn test_definition_deserializes_rfc_spelling() {
        let attr: AttributeDefinition = serde_json::from_value(serde_json::json!({
            "name": "emails",
            "type": "complex",
            "multiValued": true,
            "mutability": "readWrite",
            "returned": "default",
            "uniqueness": "none",
            "subAttributes": [
                {"name": "value", "type": "string", "multiValued": false}
            ]
        }))
        .unwrap();
        assert_eq!(attr.data_type, AttributeType::Complex);
        assert!(attr.multi_valued);
        assert!(attr.sub_attribute("VALUE").is_some());
    }
}
