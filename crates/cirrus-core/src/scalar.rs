//! Extra-spec scalar values.
//!
//! OpenStack stores flavor extra specs as string-to-string mappings, while
//! operators declare them as native scalars (integers, booleans, floats).
//! [`SpecValue`] enumerates the accepted scalar types and defines the one
//! canonical string form used for every desired-vs-remote comparison, so
//! a declared integer `5` compares equal to a remote `"5"`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar value accepted in declarative parameter mappings.
///
/// Deserializes from native JSON/YAML scalars and serializes back to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
    /// Boolean scalar, canonically `true` / `false`.
    Bool(bool),
    /// Integer scalar, canonically decimal.
    Int(i64),
    /// Floating-point scalar, canonically its shortest `Display` form.
    Float(f64),
    /// String scalar, canonically itself.
    Str(String),
}

impl SpecValue {
    /// The canonical string form of this scalar.
    ///
    /// Total over every variant. Remote extra specs are strings, so this
    /// form is what the convergence engine sends and compares against.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => s.clone(),
        }
    }

    /// Parse a scalar from a bare literal, as typed on a command line.
    ///
    /// `true`/`false` become booleans, numeric literals their numeric
    /// variants, anything else a string. Never fails.
    #[must_use]
    pub fn from_literal(s: &str) -> Self {
        match s {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = s.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Str(s.to_string())
    }
}

impl fmt::Display for SpecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl From<bool> for SpecValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SpecValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for SpecValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SpecValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SpecValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}
