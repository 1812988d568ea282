// ============================================================
// DATASET IMPORT JOB
// ============================================================
// The unit of work: one CSV source into one destination table

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::column_spec::{sanitize_identifier, table_name_from_path};
use super::{ColumnSpec, ParsingConfig};

/// How the destination table is reconciled with the CSV columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPolicy {
    /// Drop and recreate with every column TEXT
    #[default]
    Replace,

    /// Drop and recreate using each column's declared or inferred type
    ReplaceTyped,

    /// Table must already exist with the same columns in the same order
    Align,

    /// Like `Align`, then every existing row is deleted; the table's own
    /// schema (types, constraints) is kept
    Truncate,
}

impl SchemaPolicy {
    pub fn is_destructive(&self) -> bool {
        !matches!(self, SchemaPolicy::Align)
    }
}

/// Batch Loader tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Rows per multi-row insert (default: 100)
    pub batch_size: usize,

    /// Per-batch transaction timeout in milliseconds (default: 30s)
    pub batch_timeout_ms: u64,

    /// Rejection reasons kept in the report (default: 10)
    pub max_error_samples: usize,

    /// Overrides the backend's bound-parameter limit
    pub max_bound_params: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_timeout_ms: 30_000,
            max_error_samples: 10,
            max_bound_params: None,
        }
    }
}

impl LoaderConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        if self.batch_timeout_ms == 0 {
            return Err("batch_timeout_ms must be > 0".to_string());
        }
        if self.max_bound_params == Some(0) {
            return Err("max_bound_params must be > 0".to_string());
        }
        Ok(())
    }
}

/// One CSV file to import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetImportJob {
    /// Handed to the Source as-is (a path for file sources)
    pub source_id: String,

    /// Destination table (sanitized before use)
    pub table_name: String,

    /// Explicit columns; derived from the header when absent
    pub columns: Option<Vec<ColumnSpec>>,

    /// Stop after this many inserted rows
    pub target_count: Option<usize>,

    /// Column (logical name or identifier) whose value identifies a row
    pub dedup_key: Option<String>,

    pub policy: SchemaPolicy,

    /// Infer numeric column types from sampled records when columns come from the header
    pub infer_types: bool,

    /// Records sampled for type inference
    pub infer_sample_rows: usize,

    /// Encoding label understood by `encoding_rs` (default: utf-8)
    pub encoding: Option<String>,

    /// Write rejected records to this CSV file
    pub reject_path: Option<PathBuf>,

    pub parsing: ParsingConfig,
    pub loader: LoaderConfig,
}

impl DatasetImportJob {
    pub fn new(source_id: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            table_name: table_name.into(),
            columns: None,
            target_count: None,
            dedup_key: None,
            policy: SchemaPolicy::default(),
            infer_types: false,
            infer_sample_rows: 200,
            encoding: None,
            reject_path: None,
            parsing: ParsingConfig::default(),
            loader: LoaderConfig::default(),
        }
    }

    /// Job for a CSV file whose table name is derived from the file name
    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy(), table_name_from_path(path))
    }

    pub fn with_columns(mut self, columns: Vec<ColumnSpec>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_target_count(mut self, target: usize) -> Self {
        self.target_count = Some(target);
        self
    }

    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    pub fn with_policy(mut self, policy: SchemaPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_parsing(mut self, parsing: ParsingConfig) -> Self {
        self.parsing = parsing;
        self
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_type_inference(mut self, sample_rows: usize) -> Self {
        self.infer_types = true;
        self.infer_sample_rows = sample_rows;
        self
    }

    pub fn with_reject_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.reject_path = Some(path.into());
        self
    }

    /// Table identifier as it will appear in SQL
    pub fn table_ident(&self) -> String {
        sanitize_identifier(&self.table_name)
    }

    /// Validate job settings
    pub fn validate(&self) -> Result<(), String> {
        if self.source_id.trim().is_empty() {
            return Err("source_id must not be empty".to_string());
        }
        if self.table_name.trim().is_empty() {
            return Err("table_name must not be empty".to_string());
        }
        if let Some(columns) = &self.columns {
            if columns.is_empty() {
                return Err("explicit column list must not be empty".to_string());
            }
        }
        if self.columns.is_none() && !self.parsing.has_header {
            return Err("a job without a header row needs an explicit column list".to_string());
        }
        if self.target_count == Some(0) {
            return Err("target_count must be > 0".to_string());
        }
        if self.infer_types && self.infer_sample_rows == 0 {
            return Err("infer_sample_rows must be > 0".to_string());
        }
        self.parsing.validate()?;
        self.loader.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_derives_table_name() {
        let job = DatasetImportJob::from_path(Path::new("data/Insta_new_mandshashtags_cleaned.xlsx_csv.csv"));
        assert_eq!(job.table_name, "Insta_new_mandshashtags_cleaned_xlsx_csv");
        assert_eq!(job.policy, SchemaPolicy::Replace);
    }

    #[test]
    fn test_validate_rejects_headerless_job_without_columns() {
        let mut job = DatasetImportJob::new("a.csv", "a");
        job.parsing.has_header = false;
        assert!(job.validate().is_err());

        let job = job.with_columns(vec![ColumnSpec::text("a")]);
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_truncate_is_destructive() {
        assert!(SchemaPolicy::Truncate.is_destructive());
        assert!(!SchemaPolicy::Align.is_destructive());
    }

    #[test]
    fn test_validate_rejects_zero_target() {
        let job = DatasetImportJob::new("a.csv", "a").with_target_count(0);
        assert!(job.validate().is_err());
    }
}
