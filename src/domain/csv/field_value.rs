use serde::{Deserialize, Serialize};

/// One column's raw text as cut out of a logical record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Unescaped text, or `None` for a null marker
    pub raw: Option<String>,

    /// Whether any part of the field was quoted
    pub quoted: bool,
}

impl FieldValue {
    pub fn text(raw: impl Into<String>, quoted: bool) -> Self {
        Self {
            raw: Some(raw.into()),
            quoted,
        }
    }

    pub fn null(quoted: bool) -> Self {
        Self { raw: None, quoted }
    }

    pub fn is_null(&self) -> bool {
        self.raw.is_none()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}
