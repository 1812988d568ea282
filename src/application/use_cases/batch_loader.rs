// ============================================================
// BATCH LOADER
// ============================================================
// Multi-row inserts with per-row fallback on batch failure

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::domain::csv::{ColumnSpec, ImportProgress, LoaderConfig, Row, SqlValue};
use crate::domain::error::AppError;
use crate::infrastructure::db::{Destination, SqlBuilder};

/// A normalized row waiting for insertion
#[derive(Debug, Clone)]
pub struct PendingRow {
    pub row_index: usize,
    pub line: usize,
    pub values: Row,

    /// Logical record text, kept for the reject file
    pub raw: String,

    /// Dedup key registered when the row was queued
    pub key: Option<String>,
}

/// A row that failed on its own, after the batch fallback
#[derive(Debug, Clone)]
pub struct RowFailure {
    pub row: PendingRow,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub failures: Vec<RowFailure>,

    /// Whether the multi-row insert failed and rows were retried one by one
    pub fell_back: bool,
}

pub struct BatchLoader<'a> {
    destination: &'a dyn Destination,
    builder: SqlBuilder,
    table: String,
    columns: &'a [ColumnSpec],
    batch_size: usize,
    timeout: Duration,
    progress: ImportProgress,
    batches: usize,
}

impl<'a> BatchLoader<'a> {
    pub fn new(
        destination: &'a dyn Destination,
        table: impl Into<String>,
        columns: &'a [ColumnSpec],
        config: &LoaderConfig,
        progress: ImportProgress,
    ) -> Self {
        let dialect = destination.dialect();
        let max_params = config
            .max_bound_params
            .unwrap_or_else(|| dialect.max_bound_params());
        let rows_by_params = (max_params / columns.len().max(1)).max(1);

        Self {
            destination,
            builder: SqlBuilder::new(dialect),
            table: table.into(),
            columns,
            batch_size: config.batch_size.min(rows_by_params).max(1),
            timeout: config.batch_timeout(),
            progress,
            batches: 0,
        }
    }

    /// Rows per batch after the bound-parameter clamp
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Insert `rows`. Errors never escape: a failed or timed-out batch is
    /// retried row by row and only rows failing alone are returned. Rows
    /// whose commit timed out are never retried, since the destination may
    /// already hold them.
    pub async fn load(&mut self, rows: Vec<PendingRow>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if rows.is_empty() {
            return outcome;
        }
        self.batches += 1;

        let values: Vec<SqlValue> = rows.iter().flat_map(|r| r.values.iter().cloned()).collect();
        match self.insert(rows.len(), &values).await {
            Ok(()) => {
                outcome.inserted = rows.len();
                self.progress.add_inserted(rows.len() as u64);
                debug!(
                    table = %self.table,
                    batch = self.batches,
                    rows = rows.len(),
                    inserted = self.progress.inserted(),
                    "Batch inserted"
                );
                return outcome;
            }
            Err(InsertFailure::Uncertain(e)) => {
                error!(
                    table = %self.table,
                    batch = self.batches,
                    rows = rows.len(),
                    error = %e,
                    "Batch commit timed out, rows not retried"
                );
                let reason = e.to_string();
                outcome.failures = rows
                    .into_iter()
                    .map(|row| RowFailure {
                        row,
                        reason: reason.clone(),
                    })
                    .collect();
                return outcome;
            }
            Err(InsertFailure::Retryable(e)) => {
                warn!(
                    table = %self.table,
                    batch = self.batches,
                    rows = rows.len(),
                    error = %e,
                    "Batch insert failed, retrying rows individually"
                );
                outcome.fell_back = true;
            }
        }

        for row in rows {
            match self.insert(1, &row.values).await {
                Ok(()) => {
                    outcome.inserted += 1;
                    self.progress.add_inserted(1);
                }
                Err(InsertFailure::Retryable(e) | InsertFailure::Uncertain(e)) => {
                    warn!(
                        table = %self.table,
                        row = row.row_index,
                        line = row.line,
                        error = %e,
                        "Row rejected by destination"
                    );
                    outcome.failures.push(RowFailure {
                        row,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }

    /// Stage the insert under the timeout, then commit under its own. Only
    /// the staging phase can be safely retried.
    async fn insert(&self, row_count: usize, values: &[SqlValue]) -> std::result::Result<(), InsertFailure> {
        let sql = self.builder.insert(&self.table, self.columns, row_count);

        let staged = async {
            let mut tx = self.destination.begin().await?;
            tx.execute(&sql, values).await?;
            Ok::<_, AppError>(tx)
        };
        let tx = match tokio::time::timeout(self.timeout, staged).await {
            Ok(Ok(tx)) => tx,
            Ok(Err(e)) => return Err(InsertFailure::Retryable(e)),
            Err(_) => {
                return Err(InsertFailure::Retryable(AppError::DatabaseError(
                    self.timed_out("Insert"),
                )))
            }
        };

        match tokio::time::timeout(self.timeout, tx.commit()).await {
            Ok(committed) => committed.map_err(InsertFailure::Retryable),
            Err(_) => Err(InsertFailure::Uncertain(AppError::DatabaseError(format!(
                "{}; outcome unknown",
                self.timed_out("Commit")
            )))),
        }
    }

    fn timed_out(&self, phase: &str) -> String {
        format!("{} timed out after {} ms", phase, self.timeout.as_millis())
    }
}

enum InsertFailure {
    /// Nothing was committed
    Retryable(AppError),
    /// The commit never answered; the rows may or may not be stored
    Uncertain(AppError),
}
