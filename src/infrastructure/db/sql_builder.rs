//! SQL text generation for the ingestion engine.
//!
//! Only portable statements are produced: `DROP TABLE IF EXISTS`,
//! `CREATE TABLE`, `DELETE FROM`, parameterized multi-row `INSERT`,
//! `SELECT COUNT(*)` and a single-column `SELECT`. Identifiers are the only
//! interpolated tokens and are always quoted; every value travels as a bound
//! parameter.

use crate::domain::csv::{ColumnSpec, ColumnType};

use super::SqlDialect;

pub struct SqlBuilder {
    dialect: SqlDialect,
}

impl SqlBuilder {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Quote an identifier (table or column name) for the target database
    pub fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }

    /// `typed = false` makes every column TEXT
    pub fn create_table(&self, table: &str, columns: &[ColumnSpec], typed: bool) -> String {
        let defs: Vec<String> = columns
            .iter()
            .map(|column| {
                let ty = if typed {
                    self.column_type_name(column.column_type)
                } else {
                    "TEXT"
                };
                let not_null = if column.nullable { "" } else { " NOT NULL" };
                format!("{} {}{}", self.quote_identifier(&column.ident), ty, not_null)
            })
            .collect();

        format!(
            "CREATE TABLE {} ({})",
            self.quote_identifier(table),
            defs.join(", ")
        )
    }

    /// Multi-row insert with one placeholder per value
    pub fn insert(&self, table: &str, columns: &[ColumnSpec], row_count: usize) -> String {
        let column_names: Vec<String> = columns
            .iter()
            .map(|c| self.quote_identifier(&c.ident))
            .collect();

        let width = columns.len();
        let rows: Vec<String> = (0..row_count)
            .map(|row| {
                let placeholders: Vec<String> = (0..width)
                    .map(|col| self.dialect.placeholder(row * width + col + 1))
                    .collect();
                format!("({})", placeholders.join(", "))
            })
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.quote_identifier(table),
            column_names.join(", "),
            rows.join(", ")
        )
    }

    pub fn delete_all(&self, table: &str) -> String {
        format!("DELETE FROM {}", self.quote_identifier(table))
    }

    pub fn count(&self, table: &str) -> String {
        format!("SELECT COUNT(*) FROM {}", self.quote_identifier(table))
    }

    /// Select one column rendered as text by the database itself, so
    /// values of any stored type (NUMERIC, REAL, ...) compare as written
    pub fn select_column_text(&self, table: &str, column: &str) -> String {
        format!(
            "SELECT CAST({} AS TEXT) FROM {}",
            self.quote_identifier(column),
            self.quote_identifier(table)
        )
    }

    fn column_type_name(&self, column_type: ColumnType) -> &'static str {
        match (self.dialect, column_type) {
            (_, ColumnType::Text) => "TEXT",
            (_, ColumnType::Boolean) => "BOOLEAN",
            (SqlDialect::Sqlite, ColumnType::Integer) => "INTEGER",
            (SqlDialect::Sqlite, ColumnType::Float) => "REAL",
            (SqlDialect::Postgres, ColumnType::Integer) => "BIGINT",
            (SqlDialect::Postgres, ColumnType::Float) => "DOUBLE PRECISION",
        }
    }
}
