// ============================================================
// RECORD ASSEMBLER
// ============================================================
// Join physical lines into logical records by quote parity

use std::iter::Enumerate;
use std::str::SplitInclusive;

use crate::domain::csv::{LogicalRecord, ParsingConfig, RawLine};

/// Output of the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembledRecord {
    /// Quote-balanced record, ready for the tokenizer
    Complete(LogicalRecord),

    /// Input ended inside an open quoted field
    Unterminated(LogicalRecord),
}

impl AssembledRecord {
    pub fn record(&self) -> &LogicalRecord {
        match self {
            AssembledRecord::Complete(record) | AssembledRecord::Unterminated(record) => record,
        }
    }
}

/// Lazily walks the input; nothing past the last emitted record is read
pub struct RecordAssembler<'a> {
    lines: Enumerate<SplitInclusive<'a, char>>,
    join: char,
    delimiter: char,
    quote: char,
    require_full_width: bool,
    max_continuation_lines: usize,
    min_separators: usize,
    lines_read: usize,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(content: &'a str, config: &ParsingConfig) -> Self {
        Self {
            lines: content.split_inclusive('\n').enumerate(),
            join: config.join.as_char(),
            delimiter: config.delimiter,
            quote: config.quote,
            require_full_width: config.require_full_width,
            max_continuation_lines: config.max_continuation_lines,
            min_separators: 1,
            lines_read: 0,
        }
    }

    /// Set the schema width once it is known; drives the structural check
    pub fn set_expected_columns(&mut self, columns: usize) {
        self.min_separators = if columns <= 1 {
            0
        } else if self.require_full_width {
            columns - 1
        } else {
            1
        };
    }

    /// Physical lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Take the header record: the first non-blank, quote-balanced span.
    /// A header whose quote never closes swallows the whole input and comes
    /// back `Unterminated`.
    pub fn take_header(&mut self) -> Option<AssembledRecord> {
        let mut buffer = LogicalRecord::new();

        while let Some(line) = self.next_line() {
            if buffer.is_empty() && line.content.trim().is_empty() {
                continue;
            }
            buffer.append(&line, self.join, self.quote);
            if buffer.is_balanced() {
                return Some(AssembledRecord::Complete(buffer));
            }
        }

        if buffer.is_empty() {
            None
        } else {
            Some(AssembledRecord::Unterminated(buffer))
        }
    }

    fn next_line(&mut self) -> Option<RawLine<'a>> {
        let (idx, content) = self.lines.next()?;
        let content = content.strip_suffix('\n').unwrap_or(content);
        self.lines_read += 1;
        Some(RawLine {
            number: idx + 1,
            content,
        })
    }

    fn is_emittable(&self, buffer: &LogicalRecord) -> bool {
        if !buffer.is_balanced() {
            return false;
        }
        buffer.line_count >= self.max_continuation_lines
            || buffer.separator_count(self.delimiter, self.quote) >= self.min_separators
    }
}

impl Iterator for RecordAssembler<'_> {
    type Item = AssembledRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = LogicalRecord::new();

        while let Some(line) = self.next_line() {
            // Blank lines between records carry nothing
            if buffer.is_empty() && line.content.trim().is_empty() {
                continue;
            }

            buffer.append(&line, self.join, self.quote);

            if self.is_emittable(&buffer) {
                return Some(AssembledRecord::Complete(buffer));
            }
        }

        // End of input: flush whatever is left instead of dropping it
        if buffer.is_empty() {
            None
        } else if buffer.is_balanced() {
            Some(AssembledRecord::Complete(buffer))
        } else {
            Some(AssembledRecord::Unterminated(buffer))
        }
    }
}
