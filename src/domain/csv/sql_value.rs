use serde::{Deserialize, Serialize};
use std::fmt;

use super::ColumnType;

/// A normalized value ready to be bound as a statement parameter.
/// NULL keeps its column type so backends can bind a typed NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null(ColumnType),
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            SqlValue::Null(ty) => *ty,
            SqlValue::Text(_) => ColumnType::Text,
            SqlValue::Integer(_) => ColumnType::Integer,
            SqlValue::Float(_) => ColumnType::Float,
            SqlValue::Boolean(_) => ColumnType::Boolean,
        }
    }

    /// Textual form used for dedup keys; `None` for NULL
    pub fn key_text(&self) -> Option<String> {
        match self {
            SqlValue::Null(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null(_) => write!(f, "NULL"),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Integer(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}
