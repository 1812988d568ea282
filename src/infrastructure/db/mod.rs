//! Destination datastore interface and its sqlx-backed adapters.

pub mod postgres;
pub mod sql_builder;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::csv::SqlValue;
use crate::domain::error::{AppError, Result};

pub use postgres::PostgresDestination;
pub use sql_builder::SqlBuilder;
pub use sqlite::SqliteDestination;

/// One result row, values in select-list order
pub type DbRow = Vec<SqlValue>;

/// SQL flavor spoken by a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
}

impl SqlDialect {
    /// Placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}", index),
            SqlDialect::Sqlite => "?".to_string(),
        }
    }

    /// Bound parameters one statement may carry
    pub fn max_bound_params(&self) -> usize {
        match self {
            SqlDialect::Sqlite => 32_766,
            SqlDialect::Postgres => 65_535,
        }
    }
}

/// Minimal SQL-capable store the engine writes into
#[async_trait]
pub trait Destination: Send + Sync {
    fn dialect(&self) -> SqlDialect;

    /// Run a statement outside any explicit transaction
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<DbRow>>;

    async fn begin(&self) -> Result<Box<dyn DestinationTransaction>>;

    /// Column names of `table` in ordinal order; empty when the table is missing
    async fn table_columns(&self, table: &str) -> Result<Vec<String>>;
}

/// Transaction scope; dropping it without commit rolls back
#[async_trait]
pub trait DestinationTransaction: Send {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Connection settings shared by the adapters
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Pick an adapter from the URL scheme
pub async fn connect_destination(url: &str, options: &ConnectOptions) -> Result<Arc<dyn Destination>> {
    if url.starts_with("sqlite:") {
        let destination = SqliteDestination::connect(url, options).await?;
        Ok(Arc::new(destination))
    } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let destination = PostgresDestination::connect(url, options).await?;
        Ok(Arc::new(destination))
    } else {
        Err(AppError::ConfigError(format!(
            "Unsupported database URL scheme: {}",
            url.split(':').next().unwrap_or_default()
        )))
    }
}
