//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("unsupported database driver '{0}' (expected pgsql)")]
    UnsupportedDriver(String),
    #[error("env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

/// Template failures. Partial output is never returned alongside one of these.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("view {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("view {path}: malformed tag at byte {offset}")]
    Malformed { path: String, offset: usize },
    #[error("view {path}: undefined name '{name}'")]
    Undefined { path: String, name: String },
    #[error("view data must be a JSON object, got {0}")]
    Context(&'static str),
    #[error("view data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Coarse classification of an [`AppError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected statement or missing row.
    InvalidArgument,
    /// Model state does not allow the requested operation.
    Logic,
    /// Statement ran but reported no effect.
    Runtime,
    /// Driver failure outside statement validation (I/O, TLS, protocol).
    Driver,
    Config,
    Render,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("request body too large: {0}")]
    PayloadTooLarge(String),
    #[error("query rejected: {sql}: {source}")]
    Query {
        sql: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("{0}")]
    Logic(String),
    #[error("{0}")]
    Runtime(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Config,
            AppError::Render(_) => ErrorKind::Render,
            AppError::InvalidArgument(_) | AppError::PayloadTooLarge(_) => ErrorKind::InvalidArgument,
            AppError::Query { source, .. } => {
                if is_statement_error(source) {
                    ErrorKind::InvalidArgument
                } else {
                    ErrorKind::Driver
                }
            }
            AppError::Logic(_) => ErrorKind::Logic,
            AppError::Runtime(_) => ErrorKind::Runtime,
            AppError::Db(_) => ErrorKind::Driver,
        }
    }
}

/// Errors caused by the statement or its parameters rather than by the connection.
fn is_statement_error(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(_)
            | sqlx::Error::Encode(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. }
    )
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match (&self, self.kind()) {
            (AppError::PayloadTooLarge(_), _) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            (_, ErrorKind::InvalidArgument) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            (_, ErrorKind::Logic) => (StatusCode::INTERNAL_SERVER_ERROR, "logic_error"),
            (_, ErrorKind::Runtime) => (StatusCode::INTERNAL_SERVER_ERROR, "runtime_error"),
            (_, ErrorKind::Driver) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            (_, ErrorKind::Config) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            (_, ErrorKind::Render) => (StatusCode::INTERNAL_SERVER_ERROR, "render_error"),
        };
        tracing::warn!(error = %self, code, "request failed");
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
