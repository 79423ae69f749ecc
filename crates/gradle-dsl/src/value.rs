//! Property Values
//!
//! Expression values stored in elements and the resolved values handed out
//! by property models.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Literal scalar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(value) => f.write_str(value),
            LiteralValue::Integer(value) => write!(f, "{}", value),
            LiteralValue::Decimal(value) => write!(f, "{}", value),
            LiteralValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}

/// Scalar expression held by an element
#[derive(Debug, Clone, PartialEq)]
pub enum DslExpr {
    Literal(LiteralValue),
    /// Variable or property reference, e.g. `rootProject.ext.minSdk`
    Reference(String),
    /// Raw text between the quotes of a string with `$x` / `${x}` injections
    Interpolated(String),
    /// Any other expression, written back verbatim
    Unknown(String),
}

impl DslExpr {
    pub fn reference(text: impl Into<String>) -> Self {
        DslExpr::Reference(text.into())
    }

    pub fn interpolated(text: impl Into<String>) -> Self {
        DslExpr::Interpolated(text.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            DslExpr::Literal(LiteralValue::String(_)) => ValueType::String,
            DslExpr::Literal(LiteralValue::Integer(_)) => ValueType::Integer,
            DslExpr::Literal(LiteralValue::Decimal(_)) => ValueType::Decimal,
            DslExpr::Literal(LiteralValue::Boolean(_)) => ValueType::Boolean,
            DslExpr::Reference(_) => ValueType::Reference,
            DslExpr::Interpolated(_) => ValueType::Interpolated,
            DslExpr::Unknown(_) => ValueType::Custom,
        }
    }
}

impl From<LiteralValue> for DslExpr {
    fn from(value: LiteralValue) -> Self {
        DslExpr::Literal(value)
    }
}

impl From<&str> for DslExpr {
    fn from(value: &str) -> Self {
        DslExpr::Literal(LiteralValue::String(value.to_string()))
    }
}

impl From<String> for DslExpr {
    fn from(value: String) -> Self {
        DslExpr::Literal(LiteralValue::String(value))
    }
}

impl From<i64> for DslExpr {
    fn from(value: i64) -> Self {
        DslExpr::Literal(LiteralValue::Integer(value))
    }
}

impl From<i32> for DslExpr {
    fn from(value: i32) -> Self {
        DslExpr::Literal(LiteralValue::Integer(value.into()))
    }
}

impl From<f64> for DslExpr {
    fn from(value: f64) -> Self {
        DslExpr::Literal(LiteralValue::Decimal(value))
    }
}

impl From<bool> for DslExpr {
    fn from(value: bool) -> Self {
        DslExpr::Literal(LiteralValue::Boolean(value))
    }
}

/// Kind of value a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueType {
    String,
    Integer,
    Decimal,
    Boolean,
    List,
    Map,
    Reference,
    Interpolated,
    /// Method calls, arithmetic, blocks and other expressions
    Custom,
    /// No element bound
    None,
}

/// A property value after (optional) reference resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    Literal(LiteralValue),
    /// A reference that was not followed or could not be resolved
    Unresolved { reference: String },
    /// Expression text the model does not evaluate
    Raw(String),
    List(Vec<ResolvedValue>),
    Map(IndexMap<String, ResolvedValue>),
    Absent,
}

impl ResolvedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedValue::Literal(LiteralValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ResolvedValue::Literal(LiteralValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ResolvedValue::Literal(LiteralValue::Boolean(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ResolvedValue]> {
        match self {
            ResolvedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ResolvedValue::Absent)
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, ResolvedValue::Unresolved { .. })
    }

    /// String items of a list value, skipping anything else
    pub fn strings(&self) -> Vec<String> {
        self.as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    }
}

impl From<LiteralValue> for ResolvedValue {
    fn from(value: LiteralValue) -> Self {
        ResolvedValue::Literal(value)
    }
}

impl From<&str> for ResolvedValue {
    fn from(value: &str) -> Self {
        ResolvedValue::Literal(LiteralValue::String(value.to_string()))
    }
}

impl From<i64> for ResolvedValue {
    fn from(value: i64) -> Self {
        ResolvedValue::Literal(LiteralValue::Integer(value))
    }
}

impl From<bool> for ResolvedValue {
    fn from(value: bool) -> Self {
        ResolvedValue::Literal(LiteralValue::Boolean(value))
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Literal(value) => write!(f, "{}", value),
            ResolvedValue::Unresolved { reference } => f.write_str(reference),
            ResolvedValue::Raw(text) => f.write_str(text),
            ResolvedValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            ResolvedValue::Map(entries) => {
                f.write_str("[")?;
                if entries.is_empty() {
                    f.write_str(":")?;
                }
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("]")
            }
            ResolvedValue::Absent => Ok(()),
        }
    }
}
