//! Directory search filters.
//!
//! Searches accept RFC 4515 style filter strings. The [`Filter`] builder
//! renders the handful of shapes this client needs and escapes values so
//! that user-supplied names cannot change the meaning of a filter.

use std::fmt;

/// A composable search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Conjunction of the inner filters.
    And(Vec<Filter>),
    /// The attribute equals the value exactly.
    Equals(String, String),
    /// The attribute's value ends with the given suffix.
    EndsWith(String, String),
    /// The attribute is present with any value.
    Present(String),
}

impl Filter {
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals(attribute.into(), value.into())
    }

    pub fn ends_with(attribute: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::EndsWith(attribute.into(), suffix.into())
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present(attribute.into())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(parts) => {
                write!(f, "(&")?;
                for part in parts {
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
            Filter::Equals(attribute, value) => {
                write!(f, "({attribute}={})", escape_value(value))
            }
            Filter::EndsWith(attribute, suffix) => {
                write!(f, "({attribute}=*{})", escape_value(suffix))
            }
            Filter::Present(attribute) => write!(f, "({attribute}=*)"),
        }
    }
}

/// Escapes a value for embedding in a filter, per RFC 4515.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            other => escaped.push(other),
        }
    }
    escaped
}
