use crate::domain::csv::{ColumnType, SqlValue};
use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row, Sqlite, Transaction, ValueRef,
};
use std::str::FromStr;

use super::{ConnectOptions, DbRow, Destination, DestinationTransaction, SqlDialect};

pub struct SqliteDestination {
    pool: SqlitePool,
}

impl SqliteDestination {
    pub async fn connect(database_url: &str, options: &ConnectOptions) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    /// Private in-memory database. Held on a single connection that never
    /// expires, since every new SQLite memory connection is a fresh database.
    pub async fn in_memory() -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            // SQLite is dynamically typed; any null will do
            SqlValue::Null(_) => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Boolean(b) => query.bind(*b),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Result<DbRow> {
    let mut values = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        let raw = row
            .try_get_raw(index)
            .map_err(|e| AppError::DatabaseError(format!("Failed to read column {}: {}", index, e)))?;
        if raw.is_null() {
            values.push(SqlValue::Null(ColumnType::Text));
            continue;
        }

        let value = if let Ok(s) = row.try_get::<String, _>(index) {
            SqlValue::Text(s)
        } else if let Ok(i) = row.try_get::<i64, _>(index) {
            SqlValue::Integer(i)
        } else if let Ok(f) = row.try_get::<f64, _>(index) {
            SqlValue::Float(f)
        } else if let Ok(b) = row.try_get::<bool, _>(index) {
            SqlValue::Boolean(b)
        } else {
            return Err(AppError::DatabaseError(format!(
                "Unsupported value type in column {}",
                index
            )));
        };
        values.push(value);
    }
    Ok(values)
}

#[async_trait]
impl Destination for SqliteDestination {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind_values(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to execute statement: {}", e)))?;
        Ok(result.rows_affected())
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<DbRow>> {
        let rows = bind_values(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to run query: {}", e)))?;
        rows.iter().map(decode_row).collect()
    }

    async fn begin(&self) -> Result<Box<dyn DestinationTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;
        Ok(Box::new(SqliteTransaction { tx }))
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to inspect table {}: {}", table, e)))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| AppError::DatabaseError(format!("Failed to get column name: {}", e)))
            })
            .collect()
    }
}

struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl DestinationTransaction for SqliteTransaction {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind_values(sqlx::query(sql), params)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to execute statement: {}", e)))?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to roll back: {}", e)))
    }
}
