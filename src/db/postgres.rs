//! Lazily connected, request-scoped PostgreSQL handle.

use super::{row_to_map, Database, Row};
use crate::config::DbConfig;
use crate::error::AppError;
use crate::sql::PgBindValue;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tokio::sync::{Mutex, MutexGuard, OnceCell};

/// One connection, opened on the first statement and reused until dropped.
pub struct PgDatabase {
    options: PgConnectOptions,
    conn: OnceCell<Mutex<PgConnection>>,
}

impl PgDatabase {
    pub fn new(config: &DbConfig) -> Self {
        Self::from_options(config.connect_options())
    }

    pub fn from_options(options: PgConnectOptions) -> Self {
        PgDatabase {
            options,
            conn: OnceCell::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    async fn connection(&self) -> Result<MutexGuard<'_, PgConnection>, AppError> {
        let cell = self
            .conn
            .get_or_try_init(|| async {
                tracing::debug!(
                    host = %self.options.get_host(),
                    database = ?self.options.get_database(),
                    "opening database connection"
                );
                PgConnection::connect_with(&self.options).await.map(Mutex::new)
            })
            .await?;
        Ok(cell.lock().await)
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        let mut conn = self.connection().await?;
        let mut query = sqlx::query(sql);
        for p in params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&mut *conn).await?;
        Ok(rows.iter().map(row_to_map).collect::<Result<Vec<_>, _>>()?)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "execute");
        let mut conn = self.connection().await?;
        let mut query = sqlx::query(sql);
        for p in params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let done = query.execute(&mut *conn).await?;
        Ok(done.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_connect_until_used() {
        let cfg = DbConfig {
            host: "localhost".into(),
            port: 5432,
            database: "blog".into(),
            username: "app".into(),
            password: String::new(),
        };
        let db = PgDatabase::new(&cfg);
        assert!(!db.is_connected());
    }
}
