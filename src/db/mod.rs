//! Raw database access: the `Database` trait and its PostgreSQL implementation.

mod postgres;
mod row;

pub use postgres::PgDatabase;
pub use row::row_to_map;

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// One result row, column name to value.
pub type Row = serde_json::Map<String, Value>;

/// Statement execution against one request-scoped connection.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement and collect its rows. Driver errors are returned as `AppError::Db`.
    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError>;

    /// Run a statement and return the number of rows it affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, AppError>;

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, AppError> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }

    /// Execute any select and return its rows, or an empty list.
    ///
    /// A statement the server rejects (bad parameters, bad SQL) becomes `AppError::Query`
    /// carrying the driver error as its source.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError> {
        match self.fetch_all(sql, params).await {
            Err(AppError::Db(source)) => Err(AppError::Query {
                sql: sql.to_string(),
                source,
            }),
            other => other,
        }
    }

    /// Current local time as `YYYY-MM-DD HH:MM:SS`.
    fn now(&self) -> String {
        now()
    }
}

pub fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
