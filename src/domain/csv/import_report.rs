// ============================================================
// IMPORT REPORT
// ============================================================
// Auditable counts produced by one dataset import

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::error::AppError;

/// Lifecycle of a dataset import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Init,
    SchemaReady,
    Loading,
    Done,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Init => write!(f, "INIT"),
            JobState::SchemaReady => write!(f, "SCHEMA_READY"),
            JobState::Loading => write!(f, "LOADING"),
            JobState::Done => write!(f, "DONE"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

/// One sampled rejection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based data record number (header excluded)
    pub row_index: usize,

    /// Physical line the record started on
    pub line: usize,

    pub reason: String,
}

/// Terminal summary of a dataset import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub job_id: Uuid,
    pub source_id: String,
    pub table_name: String,
    pub state: JobState,

    /// Logical records encountered
    pub seen: usize,

    /// Records that tokenized to at least the schema's width
    pub parsed: usize,

    pub inserted: usize,
    pub rejected: usize,
    pub duplicates_skipped: usize,

    /// Fields downgraded to NULL by numeric coercion
    pub coercion_fallbacks: usize,

    /// Stopped early by a cancellation signal
    pub cancelled: bool,

    /// Stopped early because the target count was reached
    pub target_reached: bool,

    /// Row count read back from the destination after loading
    pub destination_count: Option<i64>,

    /// Bounded sample of rejection reasons
    pub sample_errors: Vec<RowError>,

    /// Why the job failed, when it did
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ImportReport {
    pub fn new(source_id: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            source_id: source_id.into(),
            table_name: table_name.into(),
            state: JobState::Init,
            seen: 0,
            parsed: 0,
            inserted: 0,
            rejected: 0,
            duplicates_skipped: 0,
            coercion_fallbacks: 0,
            cancelled: false,
            target_reached: false,
            destination_count: None,
            sample_errors: Vec::new(),
            error: None,
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    /// Count a rejection and keep its reason while the sample has room
    pub fn reject(&mut self, row_index: usize, line: usize, reason: impl Into<String>, max_samples: usize) {
        self.rejected += 1;
        if self.sample_errors.len() < max_samples {
            self.sample_errors.push(RowError {
                row_index,
                line,
                reason: reason.into(),
            });
        }
    }

    /// Mark the job failed by an unrecoverable error
    pub fn fail(&mut self, error: &AppError) {
        self.state = JobState::Failed;
        self.error = Some(error.to_string());
    }

    /// Partial success is still success; only structural failures are not
    pub fn is_success(&self) -> bool {
        self.state == JobState::Done
    }

    /// Get human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Import {} -> {} [{}]:\n\
             - Seen: {}\n\
             - Parsed: {}\n\
             - Inserted: {}\n\
             - Rejected: {}\n\
             - Duplicates skipped: {}",
            self.source_id,
            self.table_name,
            self.state,
            self.seen,
            self.parsed,
            self.inserted,
            self.rejected,
            self.duplicates_skipped
        )
    }
}

/// Live counters a caller may poll while a job runs
#[derive(Debug, Clone, Default)]
pub struct ImportProgress {
    inner: Arc<ProgressCounters>,
}

#[derive(Debug, Default)]
struct ProgressCounters {
    seen: AtomicU64,
    inserted: AtomicU64,
}

impl ImportProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> u64 {
        self.inner.seen.load(Ordering::Relaxed)
    }

    /// Monotonically increasing
    pub fn inserted(&self) -> u64 {
        self.inner.inserted.load(Ordering::Relaxed)
    }

    pub(crate) fn add_seen(&self, n: u64) {
        self.inner.seen.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_inserted(&self, n: u64) {
        self.inner.inserted.fetch_add(n, Ordering::Relaxed);
    }
}
