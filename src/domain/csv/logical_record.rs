// ============================================================
// LOGICAL RECORD
// ============================================================
// Physical lines and the quote-balanced records built from them

use serde::{Deserialize, Serialize};

/// One physical line of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// 1-based line number in the source
    pub number: usize,

    /// Line content without its `\n`; a preceding `\r` is kept
    pub content: &'a str,
}

/// One complete data row's text, possibly spanning several physical lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalRecord {
    /// Accumulated text, physical lines joined by the configured join character
    pub text: String,

    /// Line number of the first physical line
    pub start_line: usize,

    /// Number of physical lines consumed
    pub line_count: usize,

    /// Quote characters seen so far
    quote_count: usize,
}

impl LogicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    /// Append a physical line, joining with `join` when the record is not empty.
    /// A trailing `\r` is dropped when the line ends outside quotes; inside an
    /// open quoted field it is content, unless `join` flattens line breaks.
    pub fn append(&mut self, line: &RawLine<'_>, join: char, quote: char) {
        if self.is_empty() {
            self.start_line = line.number;
        } else {
            self.text.push(join);
        }
        self.text.push_str(line.content);
        self.line_count += 1;
        self.quote_count += line.content.chars().filter(|&c| c == quote).count();

        if self.text.ends_with('\r') && (self.is_balanced() || join != '\n') {
            self.text.pop();
        }
    }

    /// Parity of the quote count: 0 outside a quoted field, 1 inside one.
    /// Escaped `""` pairs contribute two and never change parity.
    pub fn quote_depth(&self) -> usize {
        self.quote_count % 2
    }

    pub fn is_balanced(&self) -> bool {
        self.quote_depth() == 0
    }

    /// Separators that sit outside quoted sections
    pub fn separator_count(&self, delimiter: char, quote: char) -> usize {
        let mut in_quotes = false;
        let mut count = 0;
        for c in self.text.chars() {
            if c == quote {
                in_quotes = !in_quotes;
            } else if c == delimiter && !in_quotes {
                count += 1;
            }
        }
        count
    }

    /// Truncated text for error reports
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            return self.text.clone();
        }
        let head: String = self.text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_depth_tracks_parity() {
        let mut record = LogicalRecord::new();
        record.append(&RawLine { number: 2, content: "1,\"open" }, '\n', '"');
        assert_eq!(record.quote_depth(), 1);

        record.append(&RawLine { number: 3, content: "still \"\"quoted\"\"" }, '\n', '"');
        assert_eq!(record.quote_depth(), 1);

        record.append(&RawLine { number: 4, content: "closed\",3" }, '\n', '"');
        assert!(record.is_balanced());
        assert_eq!(record.start_line, 2);
        assert_eq!(record.line_count, 3);
        assert_eq!(record.text, "1,\"open\nstill \"\"quoted\"\"\nclosed\",3");
    }

    #[test]
    fn test_carriage_return_kept_only_inside_quotes() {
        let mut record = LogicalRecord::new();
        record.append(&RawLine { number: 1, content: "1,\"x\r" }, '\n', '"');
        record.append(&RawLine { number: 2, content: "y\"\r" }, '\n', '"');
        assert_eq!(record.text, "1,\"x\r\ny\"");

        let mut flattened = LogicalRecord::new();
        flattened.append(&RawLine { number: 1, content: "1,\"x\r" }, ' ', '"');
        flattened.append(&RawLine { number: 2, content: "y\"\r" }, ' ', '"');
        assert_eq!(flattened.text, "1,\"x y\"");
    }

    #[test]
    fn test_separator_count_ignores_quoted_commas() {
        let mut record = LogicalRecord::new();
        record.append(&RawLine { number: 1, content: "a,\"b,c\",d" }, '\n', '"');
        assert_eq!(record.separator_count(',', '"'), 2);
    }
}
