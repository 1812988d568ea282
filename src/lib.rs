//! Resilient CSV ingestion into SQL tables.
//!
//! One configurable pipeline per dataset: bytes are decoded, physical lines
//! are assembled into quote-balanced records, fields are tokenized and
//! normalized, and rows are loaded in batches with per-row fallback. Every
//! job ends with an [`ImportReport`].

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::use_cases::import_runner::summary_table;
pub use application::{CsvImporter, ImportRunner};
pub use domain::csv::{
    ColumnSpec, ColumnType, DatasetImportJob, ImportProgress, ImportReport, JobState,
    LoaderConfig, ParsingConfig, SchemaPolicy,
};
pub use domain::error::{AppError, Result};
pub use infrastructure::config::AppConfig;
pub use infrastructure::db::{connect_destination, ConnectOptions, Destination, SqlDialect};
pub use infrastructure::source::{FileSource, MemorySource, Source};

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`. Safe to call more than once.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
