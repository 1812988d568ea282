// ============================================================
// VALUE NORMALIZER
// ============================================================
// Map raw field text to typed values; never fails

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::csv::{ColumnSpec, ColumnType, FieldValue, ParsingConfig, Row, SqlValue};

static NON_NUMERIC_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.\-]").unwrap());

/// A normalized row plus how many fields were downgraded to NULL
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub values: Row,
    pub coercion_fallbacks: usize,
}

pub struct ValueNormalizer<'a> {
    config: &'a ParsingConfig,
}

impl<'a> ValueNormalizer<'a> {
    pub fn new(config: &'a ParsingConfig) -> Self {
        Self { config }
    }

    /// Normalize the first `columns.len()` fields; extra trailing fields are ignored.
    /// Callers must have checked the width already.
    pub fn normalize_row(&self, fields: &[FieldValue], columns: &[ColumnSpec]) -> NormalizedRow {
        let mut coercion_fallbacks = 0;
        let values = columns
            .iter()
            .zip(fields)
            .map(|(column, field)| {
                let (value, fell_back) = self.normalize(field, column.column_type);
                if fell_back {
                    coercion_fallbacks += 1;
                }
                value
            })
            .collect();

        NormalizedRow {
            values,
            coercion_fallbacks,
        }
    }

    /// Returns the value and whether non-null input was downgraded to NULL
    pub fn normalize(&self, field: &FieldValue, column_type: ColumnType) -> (SqlValue, bool) {
        let raw = match field.as_str() {
            Some(raw) if !self.config.is_null_sentinel(raw) => raw,
            _ => return (SqlValue::Null(column_type), false),
        };

        match column_type {
            ColumnType::Text => (SqlValue::Text(raw.to_string()), false),
            ColumnType::Integer => match parse_integer(raw) {
                Some(v) => (SqlValue::Integer(v), false),
                None => (SqlValue::Null(column_type), true),
            },
            ColumnType::Float => match parse_float(raw) {
                Some(v) => (SqlValue::Float(v), false),
                None => (SqlValue::Null(column_type), true),
            },
            ColumnType::Boolean => (SqlValue::Boolean(raw == self.config.true_token), false),
        }
    }
}

/// Keep only `[0-9.-]`, e.g. `"1,234 views"` -> `"1234"`
fn strip_numeric(raw: &str) -> String {
    NON_NUMERIC_PATTERN.replace_all(raw, "").into_owned()
}

fn parse_float(raw: &str) -> Option<f64> {
    let cleaned = strip_numeric(raw);
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_integer(raw: &str) -> Option<i64> {
    let cleaned = strip_numeric(raw);
    if let Ok(v) = cleaned.parse::<i64>() {
        return Some(v);
    }

    // Decimal input truncates toward zero, as long as it fits
    let v = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let truncated = v.trunc();
    if truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}
