//! Destination wrapper for tests that need a slow or interrupting database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::csv::SqlValue;
use crate::domain::error::Result;

use super::{DbRow, Destination, DestinationTransaction, SqlDialect};

/// Delegates to `inner`, stalling multi-row inserts and insert commits
pub struct SlowDestination {
    inner: Arc<dyn Destination>,
    batch_delay: Duration,
    commit_delay: Duration,
    cancel_on_commit: Option<CancellationToken>,
    inserts: Arc<AtomicUsize>,
}

impl SlowDestination {
    pub fn new(inner: Arc<dyn Destination>) -> Self {
        Self {
            inner,
            batch_delay: Duration::ZERO,
            commit_delay: Duration::ZERO,
            cancel_on_commit: None,
            inserts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep before every INSERT carrying more than one row
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Sleep before committing a transaction that inserted rows
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Cancel `token` right after the first insert commit succeeds
    pub fn cancel_on_commit(mut self, token: CancellationToken) -> Self {
        self.cancel_on_commit = Some(token);
        self
    }

    /// INSERT statements started so far
    pub fn insert_attempts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Destination for SlowDestination {
    fn dialect(&self) -> SqlDialect {
        self.inner.dialect()
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.inner.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<DbRow>> {
        self.inner.query(sql, params).await
    }

    async fn begin(&self) -> Result<Box<dyn DestinationTransaction>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(SlowTransaction {
            inner,
            batch_delay: self.batch_delay,
            commit_delay: self.commit_delay,
            cancel_on_commit: self.cancel_on_commit.clone(),
            inserts: self.inserts.clone(),
            inserted: false,
        }))
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        self.inner.table_columns(table).await
    }
}

struct SlowTransaction {
    inner: Box<dyn DestinationTransaction>,
    batch_delay: Duration,
    commit_delay: Duration,
    cancel_on_commit: Option<CancellationToken>,
    inserts: Arc<AtomicUsize>,
    inserted: bool,
}

#[async_trait]
impl DestinationTransaction for SlowTransaction {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        if sql.starts_with("INSERT") {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inserted = true;
            if sql.contains("), (") {
                tokio::time::sleep(self.batch_delay).await;
            }
        }
        self.inner.execute(sql, params).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let SlowTransaction {
            inner,
            commit_delay,
            cancel_on_commit,
            inserted,
            ..
        } = *self;
        if !inserted {
            return inner.commit().await;
        }

        tokio::time::sleep(commit_delay).await;
        inner.commit().await?;
        if let Some(token) = cancel_on_commit {
            token.cancel();
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}
