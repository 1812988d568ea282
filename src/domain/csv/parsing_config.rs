// ============================================================
// PARSING CONFIGURATION
// ============================================================
// Quote, separator, null and continuation rules for one dataset

use serde::{Deserialize, Serialize};

/// How continuation lines of a multi-line record are glued together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    /// Keep embedded line breaks verbatim
    #[default]
    Newline,

    /// Collapse breaks to a single space
    Space,
}

impl LineJoin {
    pub fn as_char(&self) -> char {
        match self {
            LineJoin::Newline => '\n',
            LineJoin::Space => ' ',
        }
    }
}

/// Configuration for tokenizing and assembling one CSV dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Field separator (default: comma)
    pub delimiter: char,

    /// Quote character (default: double quote)
    pub quote: char,

    /// Trim surrounding whitespace from each field
    pub trim: bool,

    /// Join character for continuation lines
    pub join: LineJoin,

    /// Map sentinel text to NULL
    pub null_policy: bool,

    /// Case-insensitive texts treated as NULL when `null_policy` is on.
    /// The empty string is always a sentinel under the policy.
    pub null_sentinels: Vec<String>,

    /// Exact, case-sensitive token that makes a boolean column true
    pub true_token: String,

    /// First physical line is the header
    pub has_header: bool,

    /// Hold a record open until it has one separator per expected column gap,
    /// not just one separator. Repairs raw newlines in unquoted fields.
    pub require_full_width: bool,

    /// Upper bound on physical lines merged into one record while waiting
    /// for full width (quote balance is never cut short)
    pub max_continuation_lines: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            trim: true,
            join: LineJoin::Newline,
            null_policy: true,
            null_sentinels: vec![
                "null".to_string(),
                "undefined".to_string(),
            ],
            true_token: "true".to_string(),
            has_header: true,
            require_full_width: false,
            max_continuation_lines: 50,
        }
    }
}

impl ParsingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for scraper exports whose captions break lines outside quotes
    pub fn lenient_continuation() -> Self {
        Self {
            join: LineJoin::Space,
            require_full_width: true,
            ..Default::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.null_sentinels.push(sentinel.into());
        self
    }

    /// Is `text` a null sentinel under this configuration?
    pub fn is_null_sentinel(&self, text: &str) -> bool {
        if !self.null_policy {
            return false;
        }
        text.is_empty()
            || self
                .null_sentinels
                .iter()
                .any(|s| s.eq_ignore_ascii_case(text))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.delimiter == self.quote {
            return Err("delimiter and quote must differ".to_string());
        }
        if self.delimiter == '\n' || self.delimiter == '\r' {
            return Err("delimiter cannot be a line terminator".to_string());
        }
        if self.quote == '\n' || self.quote == '\r' {
            return Err("quote cannot be a line terminator".to_string());
        }
        if self.true_token.is_empty() {
            return Err("true_token must not be empty".to_string());
        }
        if self.max_continuation_lines == 0 {
            return Err("max_continuation_lines must be > 0".to_string());
        }
        Ok(())
    }
}
