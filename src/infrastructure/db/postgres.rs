use crate::domain::csv::{ColumnType, SqlValue};
use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row, Transaction, ValueRef};
use tracing::{error, info};

use super::{ConnectOptions, DbRow, Destination, DestinationTransaction, SqlDialect};

pub struct PostgresDestination {
    pool: PgPool,
}

impl PostgresDestination {
    pub async fn connect(database_url: &str, options: &ConnectOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        info!(
            max_connections = options.max_connections,
            "Created PostgreSQL connection pool"
        );

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in params {
        query = match value {
            SqlValue::Null(ColumnType::Text) => query.bind(None::<String>),
            SqlValue::Null(ColumnType::Integer) => query.bind(None::<i64>),
            SqlValue::Null(ColumnType::Float) => query.bind(None::<f64>),
            SqlValue::Null(ColumnType::Boolean) => query.bind(None::<bool>),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Boolean(b) => query.bind(*b),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<DbRow> {
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
        } else if let Ok(i) = row.try_get::<i32, _>(index) {
            SqlValue::Integer(i as i64)
        } else if let Ok(f) = row.try_get::<f64, _>(index) {
            SqlValue::Float(f)
        } else if let Ok(f) = row.try_get::<f32, _>(index) {
            SqlValue::Float(f as f64)
        } else if let Ok(b) = row.try_get::<bool, _>(index) {
            SqlValue::Boolean(b)
        } else {
            // NUMERIC and friends: select them with CAST(.. AS TEXT)
            return Err(AppError::DatabaseError(format!(
                "Unsupported value type in column {}; cast it to text",
                index
            )));
        };
        values.push(value);
    }
    Ok(values)
}

#[async_trait]
impl Destination for PostgresDestination {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Postgres
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
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT column_name::text AS column_name
            FROM information_schema.columns
            WHERE table_name = $1 AND table_schema = current_schema()
            ORDER BY ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to inspect table {}: {}", table, e)))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("column_name").map_err(|e| {
                    AppError::DatabaseError(format!("Failed to get column_name: {}", e))
                })
            })
            .collect()
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DestinationTransaction for PostgresTransaction {
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
