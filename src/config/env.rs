//! Database and listener settings read from the environment.

use crate::error::ConfigError;
use sqlx::postgres::PgConnectOptions;
use std::net::SocketAddr;

pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Connection settings from `DB_*` variables. Read once, immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `DB_CONNECTION` must name the PostgreSQL driver.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let driver = lookup("DB_CONNECTION").ok_or(ConfigError::Missing("DB_CONNECTION"))?;
        match driver.to_lowercase().as_str() {
            "pgsql" | "postgres" | "postgresql" => {}
            _ => return Err(ConfigError::UnsupportedDriver(driver)),
        }
        let host = lookup("DB_HOST").ok_or(ConfigError::Missing("DB_HOST"))?;
        let port = match lookup("DB_PORT").filter(|s| !s.is_empty()) {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid {
                key: "DB_PORT",
                value: p.clone(),
            })?,
            None => DEFAULT_PG_PORT,
        };
        let database = lookup("DB_DATABASE").ok_or(ConfigError::Missing("DB_DATABASE"))?;
        let username = lookup("DB_USERNAME").ok_or(ConfigError::Missing("DB_USERNAME"))?;
        let password = lookup("DB_PASSWORD").unwrap_or_default();
        Ok(DbConfig {
            host,
            port,
            database,
            username,
            password,
        })
    }

    /// sqlx options with the client encoding pinned to UTF8.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
            .options([("client_encoding", "UTF8")])
    }
}

/// Listener settings.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup("APP_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = raw.parse().map_err(|_| ConfigError::Invalid {
            key: "APP_ADDR",
            value: raw.clone(),
        })?;
        Ok(AppConfig { addr })
    }
}
