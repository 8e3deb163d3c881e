//! PATCH path expression lexer and parser.
//!
//! Turns a raw SCIM attribute path such as `addresses[type eq "work"].region`
//! into a [`PathExpression`]: an ordered, non-empty sequence of segments.
//! The parser is purely syntactic; resource-aware validation (does the
//! attribute exist, is it multi-valued) is the analyzer's job.
//!
//! Grammar (RFC 7644 Section 3.5.2 attribute paths, filter subset):
//!
//! ```text
//! path         := segment ('.' segment)*
//! segment      := identifier filterClause?
//! filterClause := '[' identifier operator value? ']'
//! operator     := 'eq' | 'ne' | 'co' | 'sw' | 'ew' | 'gt' | 'ge' | 'lt' | 'le' | 'pr'
//! ```
//!
//! A dotted identifier immediately following a closing `]` is folded into
//! that segment's sub-attribute. Quoted comparands follow JSON string
//! escaping and are decoded by `serde_json`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Error produced when a raw path string fails to parse.
///
/// Surfaced to clients as an `invalidPath` failure by the request layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path: {0}")]
pub struct PathParseError(pub String);

/// Filter comparison operators usable inside a PATCH path filter.
///
/// Only `eq` is commonly exercised by provisioning clients, but the full
/// protocol set is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equal comparison
    #[serde(rename = "eq")]
    Equal,

    /// Not equal comparison
    #[serde(rename = "ne")]
    NotEqual,

    /// Contains operation for strings
    #[serde(rename = "co")]
    Contains,

    /// Starts with operation for strings
    #[serde(rename = "sw")]
    StartsWith,

    /// Ends with operation for strings
    #[serde(rename = "ew")]
    EndsWith,

    /// Greater than
    #[serde(rename = "gt")]
    GreaterThan,

    /// Greater than or equal
    #[serde(rename = "ge")]
    GreaterThanOrEqual,

    /// Less than
    #[serde(rename = "lt")]
    LessThan,

    /// Less than or equal
    #[serde(rename = "le")]
    LessThanOrEqual,

    /// Present (attribute has a value)
    #[serde(rename = "pr")]
    Present,
}

impl FilterOperator {
    /// The protocol spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::NotEqual => "ne",
            Self::Contains => "co",
            Self::StartsWith => "sw",
            Self::EndsWith => "ew",
            Self::GreaterThan => "gt",
            Self::GreaterThanOrEqual => "ge",
            Self::LessThan => "lt",
            Self::LessThanOrEqual => "le",
            Self::Present => "pr",
        }
    }

    /// Whether the operator takes a comparand (`pr` is the only one that
    /// does not).
    pub fn requires_comparand(&self) -> bool {
        !matches!(self, Self::Present)
    }
}

impl FromStr for FilterOperator {
    type Err = PathParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_ascii_lowercase().as_str() {
            "eq" => Ok(Self::Equal),
            "ne" => Ok(Self::NotEqual),
            "co" => Ok(Self::Contains),
            "sw" => Ok(Self::StartsWith),
            "ew" => Ok(Self::EndsWith),
            "gt" => Ok(Self::GreaterThan),
            "ge" => Ok(Self::GreaterThanOrEqual),
            "lt" => Ok(Self::LessThan),
            "le" => Ok(Self::LessThanOrEqual),
            "pr" => Ok(Self::Present),
            other => Err(PathParseError(format!(
                "unknown filter operator '{other}'"
            ))),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single predicate narrowing a multi-valued attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    /// Sub-attribute of the collection element the predicate tests
    pub attribute: String,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Literal the element value is compared against; `None` for `pr`
    pub comparand: Option<Value>,
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comparand {
            Some(value) => write!(f, "{} {} {}", self.attribute, self.operator, value),
            None => write!(f, "{} {}", self.attribute, self.operator),
        }
    }
}

/// One hop of a path expression.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// A simple named hop
    Attribute(String),
    /// A multi-valued attribute narrowed by a predicate, optionally followed
    /// by one more hop into the matched element
    FilteredAttribute {
        name: String,
        filter: FilterClause,
        sub_attribute: Option<String>,
    },
}

impl PathSegment {
    /// The attribute name this segment addresses.
    pub fn name(&self) -> &str {
        match self {
            Self::Attribute(name) => name,
            Self::FilteredAttribute { name, .. } => name,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(name) => f.write_str(name),
            Self::FilteredAttribute {
                name,
                filter,
                sub_attribute,
            } => {
                write!(f, "{name}[{filter}]")?;
                if let Some(sub) = sub_attribute {
                    write!(f, ".{sub}")?;
                }
                Ok(())
            }
        }
    }
}

/// An ordered, non-empty sequence of path segments.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    segments: Vec<PathSegment>,
}

impl PathExpression {
    /// Parse a raw path string.
    ///
    /// Empty or whitespace-only input is rejected here; "apply to the
    /// resource root" is expressed by omitting the path at the operation
    /// level, never by an empty expression.
    pub fn parse(raw: &str) -> Result<Self, PathParseError> {
        Parser::new(raw).parse()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for PathExpression {
    type Err = PathParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

/// Char-cursor parser over a raw path string.
struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn parse(mut self) -> Result<PathExpression, PathParseError> {
        if self.input.trim().is_empty() {
            return Err(PathParseError("path must not be empty".to_string()));
        }

        let mut segments = Vec::new();
        loop {
            segments.push(self.parse_segment()?);
            match self.chars.peek() {
                Some((_, '.')) => {
                    self.chars.next();
                }
                Some((pos, ch)) => {
                    return Err(PathParseError(format!(
                        "unexpected character '{ch}' at offset {pos}"
                    )));
                }
                None => break,
            }
        }
        Ok(PathExpression { segments })
    }

    fn parse_segment(&mut self) -> Result<PathSegment, PathParseError> {
        let name = self.parse_identifier()?;
        if !matches!(self.chars.peek(), Some((_, '['))) {
            return Ok(PathSegment::Attribute(name));
        }
        self.chars.next();
        let filter = self.parse_filter()?;
        self.expect(']')?;

        // A dotted identifier directly after the closing bracket belongs to
        // this segment as its sub-attribute hop.
        let sub_attribute = if matches!(self.chars.peek(), Some((_, '.'))) {
            self.chars.next();
            Some(self.parse_identifier()?)
        } else {
            None
        };

        Ok(PathSegment::FilteredAttribute {
            name,
            filter,
            sub_attribute,
        })
    }

    fn parse_filter(&mut self) -> Result<FilterClause, PathParseError> {
        self.skip_whitespace();
        let attribute = self.parse_identifier()?;
        self.skip_whitespace();

        let op_token = self.parse_bare_word()?;
        let operator = op_token.parse::<FilterOperator>()?;
        self.skip_whitespace();

        let comparand = if operator.requires_comparand() {
            Some(self.parse_literal()?)
        } else {
            None
        };
        self.skip_whitespace();

        Ok(FilterClause {
            attribute,
            operator,
            comparand,
        })
    }

    /// An attribute identifier: leading letter, `$` or `_`, then letters,
    /// digits, `_`, `-` or `$` (covers `$ref`).
    fn parse_identifier(&mut self) -> Result<String, PathParseError> {
        let mut name = String::new();
        match self.chars.peek() {
            Some(&(_, ch)) if ch.is_ascii_alphabetic() || ch == '$' || ch == '_' => {
                name.push(ch);
                self.chars.next();
            }
            Some(&(pos, ch)) => {
                return Err(PathParseError(format!(
                    "expected attribute name at offset {pos}, found '{ch}'"
                )));
            }
            None => {
                return Err(PathParseError(
                    "expected attribute name at end of input".to_string(),
                ));
            }
        }
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '$' {
                name.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }
        Ok(name)
    }

    /// A run of ASCII letters (operator tokens).
    fn parse_bare_word(&mut self) -> Result<String, PathParseError> {
        let mut word = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_ascii_alphabetic() {
                word.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }
        if word.is_empty() {
            return Err(PathParseError("expected filter operator".to_string()));
        }
        Ok(word)
    }

    /// A JSON literal comparand: quoted string, number, boolean or null.
    fn parse_literal(&mut self) -> Result<Value, PathParseError> {
        match self.chars.peek() {
            Some(&(start, '"')) => {
                self.chars.next();
                let mut escaped = false;
                for (pos, ch) in self.chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == '"' {
                        let quoted = &self.input[start..=pos];
                        return serde_json::from_str::<Value>(quoted).map_err(|e| {
                            PathParseError(format!("malformed string literal {quoted}: {e}"))
                        });
                    }
                }
                Err(PathParseError("unterminated string literal".to_string()))
            }
            Some(&(start, ch)) if ch == '-' || ch.is_ascii_digit() => {
                let mut end = start;
                while let Some(&(pos, ch)) = self.chars.peek() {
                    if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E') {
                        end = pos;
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                let token = &self.input[start..=end];
                serde_json::from_str::<Value>(token)
                    .map_err(|e| PathParseError(format!("malformed number literal {token}: {e}")))
            }
            Some(&(_, ch)) if ch.is_ascii_alphabetic() => {
                let word = self.parse_bare_word()?;
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    other => Err(PathParseError(format!(
                        "expected comparison value, found '{other}'"
                    ))),
                }
            }
            Some(&(pos, ch)) => Err(PathParseError(format!(
                "expected comparison value at offset {pos}, found '{ch}'"
            ))),
            None => Err(PathParseError(
                "expected comparison value at end of input".to_string(),
            )),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, ch)) if ch.is_ascii_whitespace()) {
            self.chars.next();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), PathParseError> {
        match self.chars.next() {
            Some((_, ch)) if ch == expected => Ok(()),
            Some((pos, ch)) => Err(PathParseError(format!(
                "expected '{expected}' at offset {pos}, found '{ch}'"
            ))),
            None => Err(PathParseError(format!(
                "expected '{expected}' at end of input"
            ))),
        }
    }
}
