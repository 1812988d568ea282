// ============================================================
// COLUMN ANALYZER
// ============================================================
// Infer column types from a sample of tokenized records

use crate::domain::csv::{ColumnSpec, ColumnType, FieldValue};

/// Per-column statistics over the sampled records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnProfile {
    pub non_empty: usize,
    pub numeric: usize,
    pub with_decimal_point: usize,
}

impl ColumnProfile {
    /// All non-empty values numeric: Integer unless a decimal point shows up.
    /// No evidence at all stays Text.
    pub fn inferred_type(&self) -> ColumnType {
        if self.non_empty == 0 || self.numeric < self.non_empty {
            ColumnType::Text
        } else if self.with_decimal_point > 0 {
            ColumnType::Float
        } else {
            ColumnType::Integer
        }
    }
}

/// Sample-based type inference for header-derived columns
pub struct ColumnAnalyzer {
    max_sample_rows: usize,
}

impl ColumnAnalyzer {
    pub fn new(max_sample_rows: usize) -> Self {
        Self { max_sample_rows }
    }

    /// Profile every column over the first `max_sample_rows` records
    pub fn analyze(&self, column_count: usize, samples: &[Vec<FieldValue>]) -> Vec<ColumnProfile> {
        let mut profiles = vec![ColumnProfile::default(); column_count];

        for fields in samples.iter().take(self.max_sample_rows) {
            for (profile, field) in profiles.iter_mut().zip(fields) {
                let Some(value) = field.as_str() else {
                    continue;
                };
                if value.trim().is_empty() {
                    continue;
                }

                profile.non_empty += 1;
                if looks_numeric(value) {
                    profile.numeric += 1;
                    if value.contains('.') {
                        profile.with_decimal_point += 1;
                    }
                }
            }
        }

        profiles
    }

    /// Overwrite the column types with what the sample suggests
    pub fn infer_types(&self, columns: &mut [ColumnSpec], samples: &[Vec<FieldValue>]) {
        let profiles = self.analyze(columns.len(), samples);
        for (column, profile) in columns.iter_mut().zip(&profiles) {
            column.column_type = profile.inferred_type();
        }
    }

    /// Get detailed analysis report
    pub fn get_analysis_report(&self, columns: &[ColumnSpec], samples: &[Vec<FieldValue>]) -> String {
        let profiles = self.analyze(columns.len(), samples);
        let mut lines = vec![format!(
            "Column Analysis ({} sampled rows):",
            samples.len().min(self.max_sample_rows)
        )];

        for (column, profile) in columns.iter().zip(&profiles) {
            lines.push(format!(
                "- {}: {} ({} non-empty, {} numeric)",
                column.name,
                profile.inferred_type(),
                profile.non_empty,
                profile.numeric
            ));
        }

        lines.join("\n")
    }
}

impl Default for ColumnAnalyzer {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Digits plus the decoration scraper exports put around counts
/// (`1,234`, `$5`, `12%`). Anything else means text.
fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    let mut digits = 0;
    let mut points = 0;

    for (i, c) in trimmed.char_indices() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            '-' if i == 0 => {}
            ',' | ' ' | '$' | '%' | '+' | '£' | '€' => {}
            _ => return false,
        }
    }

    digits > 0 && points <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<FieldValue> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    FieldValue::null(false)
                } else {
                    FieldValue::text(*v, false)
                }
            })
            .collect()
    }

    #[test]
    fn test_infer_types() {
        let mut columns = vec![
            ColumnSpec::text("playCount"),
            ColumnSpec::text("videoDuration"),
            ColumnSpec::text("caption"),
            ColumnSpec::text("empty"),
        ];
        let samples = vec![
            row(&["1,204", "12.5", "Summer drop", ""]),
            row(&["88", "7", "Video 2", ""]),
            row(&["", "3.25", "", ""]),
        ];

        ColumnAnalyzer::default().infer_types(&mut columns, &samples);

        assert_eq!(columns[0].column_type, ColumnType::Integer);
        assert_eq!(columns[1].column_type, ColumnType::Float);
        assert_eq!(columns[2].column_type, ColumnType::Text);
        assert_eq!(columns[3].column_type, ColumnType::Text);
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("-12"));
        assert!(looks_numeric("$1,000"));
        assert!(looks_numeric("45%"));
        assert!(!looks_numeric("1.2.3"));
        assert!(!looks_numeric("12-05"));
        assert!(!looks_numeric("2024-01-01"));
        assert!(!looks_numeric("@user12"));
        assert!(!looks_numeric("-"));
    }

    #[test]
    fn test_sample_is_bounded() {
        let samples = vec![row(&["1"]), row(&["x"])];
        let profiles = ColumnAnalyzer::new(1).analyze(1, &samples);
        assert_eq!(profiles[0].non_empty, 1);
        assert_eq!(profiles[0].inferred_type(), ColumnType::Integer);
    }

    #[test]
    fn test_analysis_report() {
        let columns = vec![ColumnSpec::text("likes")];
        let report = ColumnAnalyzer::default().get_analysis_report(&columns, &[row(&["3"])]);
        assert!(report.contains("Column Analysis (1 sampled rows)"));
        assert!(report.contains("- likes: integer"));
    }
}
