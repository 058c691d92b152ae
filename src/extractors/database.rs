//! Hand each request its own lazily connected database handle.

use crate::db::PgDatabase;
use crate::error::{AppError, ConfigError};
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

#[async_trait]
impl<S> FromRequestParts<S> for PgDatabase
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let config = state
            .db
            .as_deref()
            .ok_or(ConfigError::Missing("DB_CONNECTION"))?;
        Ok(PgDatabase::new(config))
    }
}
