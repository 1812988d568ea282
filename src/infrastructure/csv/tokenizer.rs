// ============================================================
// TOKENIZER
// ============================================================
// Split one logical record into fields, honoring quotes

use crate::domain::csv::{FieldValue, ParsingConfig};

/// Field splitter for a single quote-balanced record
pub struct Tokenizer<'a> {
    config: &'a ParsingConfig,
}

impl<'a> Tokenizer<'a> {
    pub fn new(config: &'a ParsingConfig) -> Self {
        Self { config }
    }

    /// Tokenize a record into fields, applying the null policy
    pub fn tokenize(&self, text: &str) -> Vec<FieldValue> {
        self.scan(text)
            .into_iter()
            .map(|(value, quoted)| {
                if self.config.is_null_sentinel(&value) {
                    FieldValue::null(quoted)
                } else {
                    FieldValue::text(value, quoted)
                }
            })
            .collect()
    }

    /// Tokenize a header row; header cells are never null
    pub fn tokenize_header(&self, text: &str) -> Vec<String> {
        self.scan(text).into_iter().map(|(value, _)| value).collect()
    }

    /// Single left-to-right pass. Returns (unescaped text, quoted) per field.
    /// Unterminated quoting simply runs to the end of the text.
    fn scan(&self, text: &str) -> Vec<(String, bool)> {
        let quote = self.config.quote;
        let delimiter = self.config.delimiter;

        let mut fields = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut in_quotes = false;
        // Bytes of `current` that came from inside quotes; trailing trim stops here
        let mut protected = 0usize;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c == quote {
                if in_quotes && chars.peek() == Some(&quote) {
                    // Escaped quote ("")
                    current.push(quote);
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                    quoted = true;
                    if !in_quotes {
                        protected = current.len();
                    }
                }
            } else if c == delimiter && !in_quotes {
                fields.push(self.finish_field(std::mem::take(&mut current), quoted, protected));
                quoted = false;
                protected = 0;
            } else {
                if self.config.trim && !in_quotes && !quoted && current.is_empty() && c.is_whitespace() {
                    continue;
                }
                current.push(c);
            }
        }

        // Don't forget the last field
        fields.push(self.finish_field(current, quoted, protected));
        fields
    }

    fn finish_field(&self, mut value: String, quoted: bool, protected: usize) -> (String, bool) {
        if self.config.trim {
            let keep = value.trim_end().len().max(protected);
            value.truncate(keep);
        }
        (value, quoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(text: &str) -> Vec<FieldValue> {
        let config = ParsingConfig::default();
        Tokenizer::new(&config).tokenize(text)
    }

    #[test]
    fn test_embedded_comma_in_quotes() {
        let fields = tokenize("1,\"hello, world\",3");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].as_str(), Some("hello, world"));
        assert!(fields[1].quoted);
        assert!(!fields[0].quoted);
    }

    #[test]
    fn test_escaped_quote_round_trip() {
        let fields = tokenize("\"He said \"\"hi\"\"\"");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].as_str(), Some("He said \"hi\""));
    }

    #[test]
    fn test_literal_quotes_survive_outer_strip() {
        let fields = tokenize("\"\"\"hi\"\"\",x");
        assert_eq!(fields[0].as_str(), Some("\"hi\""));
        assert_eq!(fields[1].as_str(), Some("x"));
    }

    #[test]
    fn test_null_sentinels() {
        let fields = tokenize("a,,null,NULL,\"\",undefined, ");
        assert_eq!(fields.len(), 7);
        assert!(!fields[0].is_null());
        assert!(fields[1..].iter().all(|f| f.is_null()));
        assert!(fields[4].quoted);
    }

    #[test]
    fn test_trim_keeps_quoted_whitespace() {
        let fields = tokenize("  a  ,\"  padded  \"  ,b");
        assert_eq!(fields[0].as_str(), Some("a"));
        assert_eq!(fields[1].as_str(), Some("  padded  "));
        assert_eq!(fields[2].as_str(), Some("b"));
    }

    #[test]
    fn test_no_trim() {
        let config = ParsingConfig {
            trim: false,
            ..Default::default()
        };
        let fields = Tokenizer::new(&config).tokenize(" a , b");
        assert_eq!(fields[0].as_str(), Some(" a "));
        assert_eq!(fields[1].as_str(), Some(" b"));
    }

    #[test]
    fn test_multiline_field() {
        let fields = tokenize("4,\"multi\nline\",6");
        assert_eq!(fields[1].as_str(), Some("multi\nline"));
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let fields = tokenize("1,\"never closed, 3");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].as_str(), Some("never closed, 3"));
    }

    #[test]
    fn test_custom_delimiter() {
        let config = ParsingConfig::default().with_delimiter(';');
        let fields = Tokenizer::new(&config).tokenize("a;\"b;c\";d,e");
        let values: Vec<_> = fields.iter().map(|f| f.as_str().unwrap()).collect();
        assert_eq!(values, vec!["a", "b;c", "d,e"]);
    }

    #[test]
    fn test_header_cells_are_never_null() {
        let config = ParsingConfig::default();
        let header = Tokenizer::new(&config).tokenize_header("id,,null");
        assert_eq!(header, vec!["id", "", "null"]);
    }
}
