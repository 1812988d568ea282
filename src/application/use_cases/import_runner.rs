// ============================================================
// IMPORT RUNNER
// ============================================================
// Run several dataset imports concurrently and summarize them

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::application::use_cases::csv_importer::CsvImporter;
use crate::domain::csv::{DatasetImportJob, ImportReport};
use crate::domain::error::AppError;
use crate::infrastructure::db::Destination;
use crate::infrastructure::source::Source;

pub struct ImportRunner {
    source: Arc<dyn Source>,
    destination: Arc<dyn Destination>,
    cancel: CancellationToken,
}

impl ImportRunner {
    pub fn new(source: Arc<dyn Source>, destination: Arc<dyn Destination>) -> Self {
        Self {
            source,
            destination,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token shared with every job started by this runner
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// One task per job. Reports come back in job order; a failing job
    /// only fails its own report.
    pub async fn run_all(&self, jobs: Vec<DatasetImportJob>) -> Vec<ImportReport> {
        let mut set = JoinSet::new();
        let mut placeholders: Vec<ImportReport> = Vec::with_capacity(jobs.len());

        for (index, job) in jobs.into_iter().enumerate() {
            placeholders.push(ImportReport::new(job.source_id.clone(), job.table_ident()));

            let importer = CsvImporter::new(self.source.clone(), self.destination.clone(), job)
                .with_cancellation(self.cancel.child_token());
            set.spawn(async move { (index, importer.run_to_report().await) });
        }

        let mut reports: Vec<Option<ImportReport>> = placeholders.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => error!("Import task aborted: {}", e),
            }
        }

        let reports: Vec<ImportReport> = reports
            .into_iter()
            .zip(placeholders)
            .map(|(report, mut placeholder)| {
                report.unwrap_or_else(|| {
                    placeholder.fail(&AppError::Internal("import task aborted".to_string()));
                    placeholder
                })
            })
            .collect();

        log_summary(&reports);
        reports
    }
}

/// Render the per-dataset table the runner logs at the end
pub fn summary_table(reports: &[ImportReport]) -> String {
    let mut lines = vec![format!(
        "{:<40} {:>8} {:>8} {:>8} {:>8}  {}",
        "dataset", "seen", "inserted", "rejected", "dupes", "status"
    )];

    let (mut seen, mut inserted, mut rejected, mut dupes) = (0, 0, 0, 0);
    for report in reports {
        lines.push(format!(
            "{:<40} {:>8} {:>8} {:>8} {:>8}  {}",
            report.table_name,
            report.seen,
            report.inserted,
            report.rejected,
            report.duplicates_skipped,
            report.state
        ));
        seen += report.seen;
        inserted += report.inserted;
        rejected += report.rejected;
        dupes += report.duplicates_skipped;
    }

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    lines.push(format!(
        "{:<40} {:>8} {:>8} {:>8} {:>8}  {} failed",
        "TOTAL", seen, inserted, rejected, dupes, failed
    ));

    lines.join("\n")
}

fn log_summary(reports: &[ImportReport]) {
    info!("Import summary:\n{}", summary_table(reports));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::{JobState, SchemaPolicy};
    use crate::infrastructure::db::SqliteDestination;
    use crate::infrastructure::source::MemorySource;

    #[tokio::test]
    async fn test_failing_job_does_not_abort_siblings() {
        let source = MemorySource::new()
            .with_file("one.csv", "a,b\n1,2\n3,4\n")
            .with_file("two.csv", "x,y\n5,6\n");
        let db = Arc::new(SqliteDestination::in_memory().await.unwrap());
        let runner = ImportRunner::new(Arc::new(source), db.clone());

        let jobs = vec![
            DatasetImportJob::new("one.csv", "one"),
            DatasetImportJob::new("missing.csv", "missing"),
            DatasetImportJob::new("two.csv", "two").with_policy(SchemaPolicy::Align),
            DatasetImportJob::new("two.csv", "two_copy"),
        ];
        let reports = runner.run_all(jobs).await;

        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].state, JobState::Done);
        assert_eq!(reports[0].inserted, 2);
        assert_eq!(reports[1].state, JobState::Failed);
        assert_eq!(reports[2].state, JobState::Failed);
        assert_eq!(reports[3].state, JobState::Done);
        assert_eq!(reports[3].inserted, 1);

        let table = summary_table(&reports);
        assert!(table.contains("TOTAL"));
        assert!(table.contains("2 failed"));
    }
}
