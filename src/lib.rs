//! Wheels: a minimal web-application scaffold on axum and PostgreSQL.
//!
//! Active-record models over a declared schema, a base controller for views and
//! JSON/HTML responses, and an application bootstrap that loads `.env`.

pub mod app;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod extractors;
pub mod model;
pub mod sql;
pub mod state;
pub mod view;

pub use app::{init_tracing, load_env, Application};
pub use config::{AppConfig, DbConfig, ViewConfig};
pub use controller::{reason_phrase, Halt, Inputs, Reply, WebController};
pub use db::{Database, PgDatabase, Row};
pub use error::{AppError, ConfigError, ErrorKind, RenderError};
pub use model::{Entity, Model, Schema};
pub use state::AppState;
