// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Core types and value objects for CSV ingestion
// No I/O, no async

mod column_spec;
mod field_value;
mod import_job;
mod import_report;
mod logical_record;
mod parsing_config;
mod sql_value;

pub use column_spec::{
    dedupe_identifiers, sanitize_identifier, table_name_from_path, ColumnSpec, ColumnType,
    UNNAMED_COLUMN,
};
pub use field_value::FieldValue;
pub use import_job::{DatasetImportJob, LoaderConfig, SchemaPolicy};
pub use import_report::{ImportProgress, ImportReport, JobState, RowError};
pub use logical_record::{LogicalRecord, RawLine};
pub use parsing_config::{LineJoin, ParsingConfig};
pub use sql_value::SqlValue;

/// One normalized row, in column order
pub type Row = Vec<SqlValue>;
