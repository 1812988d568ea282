// ============================================================
// CSV IMPORT USE CASE
// ============================================================
// Read -> assemble -> normalize -> align schema -> load -> report
// for one dataset

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::use_cases::batch_loader::{BatchLoader, PendingRow};
use crate::application::use_cases::schema_aligner::SchemaAligner;
use crate::domain::csv::{
    ColumnSpec, DatasetImportJob, FieldValue, ImportProgress, ImportReport, JobState, Row,
    SchemaPolicy,
};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::{
    AssembledRecord, ColumnAnalyzer, RecordAssembler, RejectWriter, Tokenizer, ValueNormalizer,
};
use crate::infrastructure::db::{Destination, SqlBuilder};
use crate::infrastructure::source::{decode, Source};

const UNTERMINATED_REASON: &str = "unterminated quoted field at end of input";

/// Imports one dataset. Consumed by `run`, so each importer runs once.
pub struct CsvImporter {
    source: Arc<dyn Source>,
    destination: Arc<dyn Destination>,
    job: DatasetImportJob,
    progress: ImportProgress,
    cancel: CancellationToken,
}

impl CsvImporter {
    pub fn new(source: Arc<dyn Source>, destination: Arc<dyn Destination>, job: DatasetImportJob) -> Self {
        Self {
            source,
            destination,
            job,
            progress: ImportProgress::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between batches once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Live counters; poll from another task while `run` executes
    pub fn progress(&self) -> ImportProgress {
        self.progress.clone()
    }

    pub fn job(&self) -> &DatasetImportJob {
        &self.job
    }

    /// Run the import, propagating structural failures
    pub async fn run(self) -> Result<ImportReport> {
        let (report, outcome) = self.execute().await;
        outcome.map(|_| report)
    }

    /// Run the import; structural failures end up in the report as `FAILED`
    pub async fn run_to_report(self) -> ImportReport {
        self.execute().await.0
    }

    async fn execute(self) -> (ImportReport, Result<()>) {
        let start = Instant::now();
        let mut report = ImportReport::new(self.job.source_id.clone(), self.job.table_ident());

        info!(source = %self.job.source_id, table = %report.table_name, job_id = %report.job_id, "Starting import");
        let outcome = self.import(&mut report).await;
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(()) => {
                report.state = JobState::Done;
                info!(
                    source = %report.source_id,
                    table = %report.table_name,
                    seen = report.seen,
                    inserted = report.inserted,
                    rejected = report.rejected,
                    duplicates = report.duplicates_skipped,
                    elapsed_ms = report.elapsed_ms,
                    "Import finished"
                );
            }
            Err(e) => {
                report.fail(e);
                error!(
                    source = %report.source_id,
                    table = %report.table_name,
                    kind = e.kind(),
                    "Import failed: {}",
                    e
                );
            }
        }

        (report, outcome)
    }

    async fn import(&self, report: &mut ImportReport) -> Result<()> {
        let job = &self.job;
        job.validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid import job: {}", e)))?;

        let bytes = self.source.read_all(&job.source_id).await?;
        let content = decode(&bytes, job.encoding.as_deref())?;
        drop(bytes);

        let parsing = &job.parsing;
        let tokenizer = Tokenizer::new(parsing);
        let normalizer = ValueNormalizer::new(parsing);
        let mut assembler = RecordAssembler::new(&content, parsing);

        // Header
        let header = if parsing.has_header {
            let record = match assembler.take_header() {
                Some(AssembledRecord::Complete(record)) => record,
                Some(AssembledRecord::Unterminated(record)) => {
                    return Err(AppError::ParseError(format!(
                        "{}: header starting at line {} has an unterminated quoted field",
                        job.source_id, record.start_line
                    )))
                }
                None => {
                    return Err(AppError::ParseError(format!(
                        "{} has no header row",
                        job.source_id
                    )))
                }
            };
            Some(tokenizer.tokenize_header(&record.text))
        } else {
            None
        };

        let mut columns = match (&job.columns, &header) {
            (Some(columns), Some(header)) => {
                if header.len() != columns.len() {
                    warn!(
                        source = %job.source_id,
                        header = header.len(),
                        declared = columns.len(),
                        "Header width differs from the declared columns; using the declared columns"
                    );
                }
                columns.clone()
            }
            (Some(columns), None) => columns.clone(),
            (None, Some(header)) => ColumnSpec::from_headers(header),
            (None, None) => {
                return Err(AppError::ValidationError(
                    "a job without a header row needs an explicit column list".to_string(),
                ))
            }
        };
        assembler.set_expected_columns(columns.len());

        // Optional type inference over a leading sample; sampled records are
        // replayed into the pipeline afterwards
        let mut sampled: Vec<AssembledRecord> = Vec::new();
        if job.infer_types && job.columns.is_none() {
            // Never sample past the target cap
            let sample_rows = job
                .target_count
                .map_or(job.infer_sample_rows, |target| target.min(job.infer_sample_rows));
            sampled = assembler.by_ref().take(sample_rows).collect();
            let samples: Vec<Vec<FieldValue>> = sampled
                .iter()
                .filter_map(|r| match r {
                    AssembledRecord::Complete(record) => Some(tokenizer.tokenize(&record.text)),
                    AssembledRecord::Unterminated(_) => None,
                })
                .collect();

            let analyzer = ColumnAnalyzer::new(job.infer_sample_rows);
            analyzer.infer_types(&mut columns, &samples);
            debug!("{}", analyzer.get_analysis_report(&columns, &samples));
        }

        let table = job.table_ident();
        let destination = self.destination.as_ref();
        SchemaAligner::new(destination)
            .align(&table, &columns, job.policy)
            .await?;
        report.state = JobState::SchemaReady;

        let dedup = match &job.dedup_key {
            Some(key) => Some(self.seed_dedup(key, &table, &columns).await?),
            None => None,
        };

        let rejects = match &job.reject_path {
            Some(path) => Some(RejectWriter::create(path)?),
            None => None,
        };

        let loader = BatchLoader::new(destination, table.clone(), &columns, &job.loader, self.progress.clone());
        let batch_size = loader.batch_size();
        let mut ctx = LoadContext {
            loader,
            report,
            dedup,
            rejects,
            max_samples: job.loader.max_error_samples,
        };

        ctx.report.state = JobState::Loading;
        info!(table = %table, columns = columns.len(), batch_size, "Loading records");

        let mut records = sampled.into_iter().chain(assembler.by_ref());
        let mut pending: Vec<PendingRow> = Vec::with_capacity(batch_size);
        let mut row_index = 0;

        loop {
            if self.cancel.is_cancelled() {
                ctx.report.cancelled = true;
                warn!(table = %table, inserted = ctx.report.inserted, "Import cancelled");
                break;
            }

            if let Some(target) = job.target_count {
                if ctx.report.inserted + pending.len() >= target {
                    ctx.flush(std::mem::take(&mut pending)).await?;
                    if ctx.report.inserted >= target {
                        ctx.report.target_reached = true;
                        info!(table = %table, target, "Target count reached");
                        break;
                    }
                }
            }

            let Some(assembled) = records.next() else {
                break;
            };
            row_index += 1;
            ctx.report.seen += 1;
            self.progress.add_seen(1);

            let record = match assembled {
                AssembledRecord::Complete(record) => record,
                AssembledRecord::Unterminated(record) => {
                    ctx.reject(row_index, record.start_line, UNTERMINATED_REASON, &record.text)?;
                    continue;
                }
            };

            let fields = tokenizer.tokenize(&record.text);
            if fields.len() < columns.len() {
                let reason = format!("expected {} fields, found {}", columns.len(), fields.len());
                ctx.reject(row_index, record.start_line, &reason, &record.text)?;
                continue;
            }
            ctx.report.parsed += 1;

            let normalized = normalizer.normalize_row(&fields, &columns);
            ctx.report.coercion_fallbacks += normalized.coercion_fallbacks;

            let key = match ctx.dedup.as_mut() {
                Some(dedup) => match dedup.admit(&normalized.values) {
                    Admission::Duplicate => {
                        ctx.report.duplicates_skipped += 1;
                        continue;
                    }
                    Admission::New(key) => key,
                },
                None => None,
            };

            pending.push(PendingRow {
                row_index,
                line: record.start_line,
                values: normalized.values,
                raw: record.text,
                key,
            });

            if pending.len() >= batch_size {
                ctx.flush(std::mem::take(&mut pending)).await?;
            }
        }

        ctx.flush(pending).await?;

        if let Some(rejects) = ctx.rejects.take() {
            let written = rejects.finish()?;
            if let Some(path) = &job.reject_path {
                info!(path = %path.display(), written, "Rejected records written");
            }
        }

        ctx.report.destination_count = self.count_rows(&table).await;
        Ok(())
    }

    /// Load keys already present so re-runs skip them. Tables that were just
    /// recreated are empty and need no query.
    async fn seed_dedup(&self, key: &str, table: &str, columns: &[ColumnSpec]) -> Result<DedupFilter> {
        let column = columns.iter().position(|c| c.matches(key)).ok_or_else(|| {
            AppError::ValidationError(format!("Dedup key {} is not a column of {}", key, table))
        })?;

        let mut keys = HashSet::new();
        if self.job.policy == SchemaPolicy::Align {
            let builder = SqlBuilder::new(self.destination.dialect());
            let sql = builder.select_column_text(table, &columns[column].ident);
            let rows = self.destination.query(&sql, &[]).await?;
            keys.extend(rows.iter().filter_map(|row| row.first().and_then(|v| v.key_text())));
            info!(table = %table, key = %key, existing = keys.len(), "Seeded dedup keys");
        }

        Ok(DedupFilter { column, keys })
    }

    async fn count_rows(&self, table: &str) -> Option<i64> {
        let sql = SqlBuilder::new(self.destination.dialect()).count(table);
        match self.destination.query(&sql, &[]).await {
            Ok(rows) => rows.first().and_then(|row| row.first()).and_then(|v| v.as_i64()),
            Err(e) => {
                warn!(table = %table, error = %e, "Could not verify destination row count");
                None
            }
        }
    }
}

enum Admission {
    Duplicate,
    New(Option<String>),
}

/// Keys of rows already inserted or queued
struct DedupFilter {
    column: usize,
    keys: HashSet<String>,
}

impl DedupFilter {
    /// NULL keys are never treated as duplicates
    fn admit(&mut self, row: &Row) -> Admission {
        let Some(key) = row.get(self.column).and_then(|v| v.key_text()) else {
            return Admission::New(None);
        };
        if self.keys.insert(key.clone()) {
            Admission::New(Some(key))
        } else {
            Admission::Duplicate
        }
    }

    fn forget(&mut self, key: &str) {
        self.keys.remove(key);
    }
}

struct LoadContext<'a> {
    loader: BatchLoader<'a>,
    report: &'a mut ImportReport,
    dedup: Option<DedupFilter>,
    rejects: Option<RejectWriter>,
    max_samples: usize,
}

impl LoadContext<'_> {
    async fn flush(&mut self, rows: Vec<PendingRow>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let outcome = self.loader.load(rows).await;
        self.report.inserted += outcome.inserted;

        for failure in outcome.failures {
            let row = failure.row;
            if let (Some(dedup), Some(key)) = (self.dedup.as_mut(), row.key.as_deref()) {
                dedup.forget(key);
            }
            self.reject(row.row_index, row.line, &failure.reason, &row.raw)?;
        }
        Ok(())
    }

    fn reject(&mut self, row_index: usize, line: usize, reason: &str, raw: &str) -> Result<()> {
        debug!(row = row_index, line, reason, "Record rejected");
        self.report.reject(row_index, line, reason, self.max_samples);
        if let Some(writer) = self.rejects.as_mut() {
            writer.write(row_index, line, reason, raw)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::{ColumnType, LoaderConfig, SqlValue};
    use crate::infrastructure::db::testing::SlowDestination;
    use crate::infrastructure::db::SqliteDestination;
    use crate::infrastructure::source::MemorySource;

    async fn sqlite() -> Arc<SqliteDestination> {
        Arc::new(SqliteDestination::in_memory().await.unwrap())
    }

    fn source(name: &str, content: &str) -> Arc<dyn Source> {
        Arc::new(MemorySource::new().with_file(name, content.to_string()))
    }

    async fn select_all(db: &SqliteDestination, sql: &str) -> Vec<Vec<SqlValue>> {
        db.query(sql, &[]).await.unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_quoted_and_multiline() {
        let db = sqlite().await;
        let content = "a,b,c\n1,\"hello, world\",3\n4,\"multi\nline\",6\n";
        let columns = ColumnSpec::parse_list("a:int, b:text, c:int").unwrap();
        let job = DatasetImportJob::new("in.csv", "t")
            .with_columns(columns)
            .with_policy(SchemaPolicy::ReplaceTyped);

        let report = CsvImporter::new(source("in.csv", content), db.clone(), job)
            .run()
            .await
            .unwrap();

        assert_eq!(report.state, JobState::Done);
        assert_eq!(report.seen, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.destination_count, Some(2));

        let rows = select_all(&db, "SELECT a, b, c FROM \"t\" ORDER BY a").await;
        assert_eq!(
            rows[0],
            vec![SqlValue::Integer(1), SqlValue::from("hello, world"), SqlValue::Integer(3)]
        );
        assert_eq!(
            rows[1],
            vec![SqlValue::Integer(4), SqlValue::from("multi\nline"), SqlValue::Integer(6)]
        );
    }

    #[tokio::test]
    async fn test_escaped_quote_and_three_line_field() {
        let db = sqlite().await;
        let content = "id,text\n1,\"He said \"\"hi\"\"\"\n2,\"one\ntwo\nthree\"\n";
        let job = DatasetImportJob::new("q.csv", "q");

        let report = CsvImporter::new(source("q.csv", content), db.clone(), job)
            .run()
            .await
            .unwrap();
        assert_eq!(report.inserted, 2);

        let rows = select_all(&db, "SELECT \"text\" FROM \"q\" ORDER BY id").await;
        assert_eq!(rows[0][0], SqlValue::from("He said \"hi\""));
        assert_eq!(rows[1][0], SqlValue::from("one\ntwo\nthree"));
    }

    #[tokio::test]
    async fn test_batch_failure_isolation() {
        let db = sqlite().await;
        let mut content = String::from("id,name\n");
        for i in 1..=50 {
            if i == 17 {
                content.push_str(",missing id\n");
            } else {
                content.push_str(&format!("{},name {}\n", i, i));
            }
        }
        let columns = vec![
            ColumnSpec::new("id", ColumnType::Integer).not_null(),
            ColumnSpec::text("name"),
        ];
        let job = DatasetImportJob::new("b.csv", "b")
            .with_columns(columns)
            .with_policy(SchemaPolicy::ReplaceTyped)
            .with_loader(LoaderConfig {
                batch_size: 20,
                ..LoaderConfig::default()
            });

        let report = CsvImporter::new(source("b.csv", &content), db.clone(), job)
            .run()
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.seen, 50);
        assert_eq!(report.inserted, 49);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.sample_errors[0].row_index, 17);
        assert_eq!(report.destination_count, Some(49));
    }

    #[tokio::test]
    async fn test_target_count_stops_reading() {
        let db = sqlite().await;
        let mut content = String::from("id,value\n");
        for i in 1..=30 {
            content.push_str(&format!("{},v{}\n", i, i));
        }
        let job = DatasetImportJob::new("c.csv", "c").with_target_count(10);
        let importer = CsvImporter::new(source("c.csv", &content), db.clone(), job);
        let progress = importer.progress();

        let report = importer.run().await.unwrap();
        assert_eq!(report.inserted, 10);
        assert_eq!(report.seen, 10);
        assert!(report.target_reached);
        assert_eq!(progress.inserted(), 10);
        assert_eq!(progress.seen(), 10);
        assert_eq!(report.destination_count, Some(10));
    }

    #[tokio::test]
    async fn test_dedup_skips_existing_keys() {
        let db = sqlite().await;
        db.execute("CREATE TABLE \"posts\" (\"url\" TEXT, \"likes\" TEXT)", &[])
            .await
            .unwrap();
        db.execute(
            "INSERT INTO \"posts\" VALUES (?, ?)",
            &[SqlValue::from("https://x/1"), SqlValue::from("5")],
        )
        .await
        .unwrap();

        let content = "url,likes\nhttps://x/1,7\nhttps://x/2,3\nhttps://x/2,4\n";
        let job = DatasetImportJob::new("p.csv", "posts")
            .with_policy(SchemaPolicy::Align)
            .with_dedup_key("url");

        let report = CsvImporter::new(source("p.csv", content), db.clone(), job)
            .run()
            .await
            .unwrap();

        assert_eq!(report.seen, 3);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates_skipped, 2);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.destination_count, Some(2));
    }

    #[tokio::test]
    async fn test_align_mismatch_fails_job() {
        let db = sqlite().await;
        db.execute("CREATE TABLE \"m\" (\"x\" TEXT)", &[]).await.unwrap();

        let job = DatasetImportJob::new("m.csv", "m").with_policy(SchemaPolicy::Align);
        let importer = CsvImporter::new(source("m.csv", "a,b\n1,2\n"), db.clone(), job.clone());
        let result = importer.run().await;
        assert!(matches!(result, Err(AppError::SchemaMismatch(_))));

        let report = CsvImporter::new(source("m.csv", "a,b\n1,2\n"), db.clone(), job)
            .run_to_report()
            .await;
        assert_eq!(report.state, JobState::Failed);
        assert!(report.error.is_some());
        assert_eq!(report.inserted, 0);
    }

    #[tokio::test]
    async fn test_missing_source_fails_before_schema() {
        let db = sqlite().await;
        let job = DatasetImportJob::new("nope.csv", "nope");
        let importer = CsvImporter::new(Arc::new(MemorySource::new()), db.clone(), job);
        let result = importer.run().await;
        assert!(matches!(result, Err(AppError::SourceUnavailable(_))));
        assert!(db.table_columns("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_records_are_rejected_not_padded() {
        let db = sqlite().await;
        let content = "a,b,c\n1,2,3\n4,5\n7,8,9\n";
        let mut job = DatasetImportJob::new("s.csv", "s");
        job.parsing.require_full_width = true;
        job.parsing.max_continuation_lines = 1;

        let report = CsvImporter::new(source("s.csv", content), db.clone(), job)
            .run()
            .await
            .unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.sample_errors[0].reason, "expected 3 fields, found 2");

        let rows = select_all(&db, "SELECT COUNT(*) FROM \"s\" WHERE c IS NULL").await;
        assert_eq!(rows[0][0], SqlValue::Integer(0));
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_rejected() {
        let db = sqlite().await;
        let content = "a,b\n1,x\n2,\"open\n";
        let report = CsvImporter::new(source("u.csv", content), db.clone(), DatasetImportJob::new("u.csv", "u"))
            .run()
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.sample_errors[0].reason, UNTERMINATED_REASON);
    }

    #[tokio::test]
    async fn test_type_inference_and_coercion() {
        let db = sqlite().await;
        let content = "views,score,title\n\"1,200\",2.5,Video 2\n300,oops.x,Clip\n";
        let job = DatasetImportJob::new("i.csv", "i")
            .with_policy(SchemaPolicy::ReplaceTyped)
            .with_type_inference(10);

        let report = CsvImporter::new(source("i.csv", content), db.clone(), job)
            .run()
            .await
            .unwrap();
        assert_eq!(report.inserted, 2);

        let rows = select_all(&db, "SELECT views, title FROM \"i\" ORDER BY views").await;
        assert_eq!(rows[0], vec![SqlValue::Integer(300), SqlValue::from("Clip")]);
        assert_eq!(rows[1], vec![SqlValue::Integer(1200), SqlValue::from("Video 2")]);
    }

    #[tokio::test]
    async fn test_cancelled_before_loading() {
        let db = sqlite().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = CsvImporter::new(source("x.csv", "a,b\n1,2\n"), db.clone(), DatasetImportJob::new("x.csv", "x"))
            .with_cancellation(cancel)
            .run()
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.seen, 0);
        assert_eq!(report.state, JobState::Done);
    }

    #[tokio::test]
    async fn test_reject_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let reject_path = dir.path().join("rejects.csv");
        let db = sqlite().await;
        let mut job = DatasetImportJob::new("r.csv", "r").with_reject_path(&reject_path);
        job.parsing.require_full_width = true;
        job.parsing.max_continuation_lines = 1;

        let report = CsvImporter::new(source("r.csv", "a,b,c\n1,2\n3,4,5\n"), db.clone(), job)
            .run()
            .await
            .unwrap();
        assert_eq!(report.rejected, 1);

        let written = std::fs::read_to_string(&reject_path).unwrap();
        assert!(written.contains("expected 3 fields, found 2"));
    }

    #[tokio::test]
    async fn test_cancel_between_batches_keeps_whole_batches() {
        let db = sqlite().await;
        let cancel = CancellationToken::new();
        let slow = Arc::new(SlowDestination::new(db.clone()).cancel_on_commit(cancel.clone()));

        let mut content = String::from("id,name\n");
        for i in 1..=20 {
            content.push_str(&format!("{},n{}\n", i, i));
        }
        let job = DatasetImportJob::new("k.csv", "k").with_loader(LoaderConfig {
            batch_size: 5,
            ..LoaderConfig::default()
        });

        let report = CsvImporter::new(source("k.csv", &content), slow, job)
            .with_cancellation(cancel)
            .run()
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.state, JobState::Done);
        assert_eq!(report.inserted, 5);
        assert_eq!(report.seen, 5);
        assert_eq!(report.destination_count, Some(5));
    }

    #[tokio::test]
    async fn test_unterminated_header_fails_before_schema() {
        let db = sqlite().await;
        db.execute("CREATE TABLE \"h\" (\"keep\" TEXT)", &[]).await.unwrap();
        db.execute("INSERT INTO \"h\" VALUES (?)", &[SqlValue::from("old")])
            .await
            .unwrap();

        let content = "id,\"name\n1,a\n2,b\n3,c\n";
        let result = CsvImporter::new(source("h.csv", content), db.clone(), DatasetImportJob::new("h.csv", "h"))
            .run()
            .await;

        assert!(matches!(result, Err(AppError::ParseError(_))));
        assert_eq!(db.table_columns("h").await.unwrap(), vec!["keep"]);
        let rows = select_all(&db, "SELECT \"keep\" FROM \"h\"").await;
        assert_eq!(rows, vec![vec![SqlValue::from("old")]]);
    }

    #[tokio::test]
    async fn test_crlf_input_keeps_carriage_return_inside_quotes() {
        let db = sqlite().await;
        let content = "id,text\r\n1,\"x\r\ny\"\r\n2,plain\r\n";

        let report = CsvImporter::new(source("w.csv", content), db.clone(), DatasetImportJob::new("w.csv", "w"))
            .run()
            .await
            .unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(db.table_columns("w").await.unwrap(), vec!["id", "text"]);

        let rows = select_all(&db, "SELECT \"text\" FROM \"w\" ORDER BY id").await;
        assert_eq!(rows[0][0], SqlValue::from("x\r\ny"));
        assert_eq!(rows[1][0], SqlValue::from("plain"));
    }

    #[tokio::test]
    async fn test_truncate_reloads_existing_table() {
        let db = sqlite().await;
        db.execute("CREATE TABLE \"tr\" (\"id\" INTEGER NOT NULL, \"name\" TEXT)", &[])
            .await
            .unwrap();
        db.execute(
            "INSERT INTO \"tr\" VALUES (?, ?)",
            &[SqlValue::Integer(99), SqlValue::from("stale")],
        )
        .await
        .unwrap();

        let job = DatasetImportJob::new("tr.csv", "tr")
            .with_policy(SchemaPolicy::Truncate)
            .with_dedup_key("id");
        let report = CsvImporter::new(source("tr.csv", "id,name\n99,fresh\n100,new\n"), db.clone(), job)
            .run()
            .await
            .unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.duplicates_skipped, 0);
        assert_eq!(report.destination_count, Some(2));
        let rows = select_all(&db, "SELECT id, name FROM \"tr\" ORDER BY id").await;
        assert_eq!(rows[0], vec![SqlValue::Integer(99), SqlValue::from("fresh")]);
    }

    #[tokio::test]
    async fn test_inference_sample_stops_at_target() {
        let db = sqlite().await;
        let mut content = String::from("n\n");
        for i in 1..=10 {
            content.push_str(&format!("{}\n", i));
        }
        for _ in 0..10 {
            content.push_str("abc\n");
        }
        let job = DatasetImportJob::new("n.csv", "n")
            .with_policy(SchemaPolicy::ReplaceTyped)
            .with_type_inference(100)
            .with_target_count(10);

        let report = CsvImporter::new(source("n.csv", &content), db.clone(), job)
            .run()
            .await
            .unwrap();
        assert_eq!(report.inserted, 10);
        assert_eq!(report.seen, 10);

        let types = select_all(&db, "SELECT type FROM pragma_table_info('n') WHERE name = 'n'").await;
        assert_eq!(types[0][0], SqlValue::from("INTEGER"));
    }

    #[tokio::test]
    async fn test_dedup_matches_real_column_as_written() {
        let db = sqlite().await;
        db.execute("CREATE TABLE \"f\" (\"score\" REAL, \"label\" TEXT)", &[])
            .await
            .unwrap();
        db.execute(
            "INSERT INTO \"f\" VALUES (?, ?)",
            &[SqlValue::Float(2.0), SqlValue::from("old")],
        )
        .await
        .unwrap();

        let job = DatasetImportJob::new("f.csv", "f")
            .with_policy(SchemaPolicy::Align)
            .with_dedup_key("score");
        let report = CsvImporter::new(source("f.csv", "score,label\n2.0,again\n3.5,new\n"), db.clone(), job)
            .run()
            .await
            .unwrap();

        assert_eq!(report.duplicates_skipped, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.destination_count, Some(2));
    }
}
