// ============================================================
// SCHEMA ALIGNER
// ============================================================
// Make sure the destination table matches the CSV column set

use tracing::{debug, info};

use crate::domain::csv::{ColumnSpec, SchemaPolicy};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::{Destination, SqlBuilder};

pub struct SchemaAligner<'a> {
    destination: &'a dyn Destination,
    builder: SqlBuilder,
}

impl<'a> SchemaAligner<'a> {
    pub fn new(destination: &'a dyn Destination) -> Self {
        Self {
            destination,
            builder: SqlBuilder::new(destination.dialect()),
        }
    }

    /// Apply `policy` to `table`. Only `Align` and `Truncate` can fail on a
    /// healthy destination: a missing table or a column list that differs in
    /// count, name or order is a `SchemaMismatch`.
    pub async fn align(&self, table: &str, columns: &[ColumnSpec], policy: SchemaPolicy) -> Result<()> {
        match policy {
            SchemaPolicy::Replace => self.recreate(table, columns, false).await,
            SchemaPolicy::ReplaceTyped => self.recreate(table, columns, true).await,
            SchemaPolicy::Align => self.verify(table, columns).await,
            SchemaPolicy::Truncate => {
                self.verify(table, columns).await?;
                self.truncate(table).await
            }
        }
    }

    async fn truncate(&self, table: &str) -> Result<()> {
        let deleted = self
            .destination
            .execute(&self.builder.delete_all(table), &[])
            .await?;
        info!(table = %table, deleted, "Destination table emptied");
        Ok(())
    }

    async fn recreate(&self, table: &str, columns: &[ColumnSpec], typed: bool) -> Result<()> {
        let drop_sql = self.builder.drop_table(table);
        let create_sql = self.builder.create_table(table, columns, typed);
        debug!(table = %table, sql = %create_sql, "Recreating destination table");

        let mut tx = self.destination.begin().await?;
        tx.execute(&drop_sql, &[]).await?;
        tx.execute(&create_sql, &[]).await?;
        tx.commit().await?;

        info!(table = %table, columns = columns.len(), typed, "Destination table recreated");
        Ok(())
    }

    async fn verify(&self, table: &str, columns: &[ColumnSpec]) -> Result<()> {
        let existing = self.destination.table_columns(table).await?;
        if existing.is_empty() {
            return Err(AppError::SchemaMismatch(format!(
                "Table {} does not exist",
                table
            )));
        }

        let expected: Vec<&str> = columns.iter().map(|c| c.ident.as_str()).collect();
        let matches = existing.len() == expected.len()
            && existing
                .iter()
                .zip(&expected)
                .all(|(have, want)| have.eq_ignore_ascii_case(want));

        if !matches {
            return Err(AppError::SchemaMismatch(format!(
                "Table {} has columns [{}], expected [{}]",
                table,
                existing.join(", "),
                expected.join(", ")
            )));
        }

        info!(table = %table, columns = columns.len(), "Destination table aligned");
        Ok(())
    }
}
