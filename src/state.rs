//! Shared application state for all routes. Read-only after startup.

use crate::config::{DbConfig, ViewConfig};
use crate::error::ConfigError;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    /// `None` when no `DB_CONNECTION` is configured; handlers asking for a database then fail.
    pub db: Option<Arc<DbConfig>>,
    pub views: Arc<ViewConfig>,
}

impl AppState {
    pub fn new(views: ViewConfig) -> Self {
        AppState {
            db: None,
            views: Arc::new(views),
        }
    }

    pub fn with_db(mut self, db: DbConfig) -> Self {
        self.db = Some(Arc::new(db));
        self
    }

    /// Views from `VIEW_*`; database from `DB_*` when `DB_CONNECTION` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let state = AppState::new(ViewConfig::from_env());
        if std::env::var_os("DB_CONNECTION").is_none() {
            tracing::info!("DB_CONNECTION not set, running without a database");
            return Ok(state);
        }
        Ok(state.with_db(DbConfig::from_env()?))
    }
}
