//! Application bootstrap: environment file, base path and the axum router.

use crate::error::{AppError, ConfigError};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::MethodRouter;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `wheels=info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wheels=info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Load `<dir>/../.env` when it exists. Variables already set are kept.
/// Returns whether a file was loaded.
pub fn load_env(dir: impl AsRef<Path>) -> Result<bool, ConfigError> {
    let path = env_file(dir.as_ref());
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no env file");
        return Ok(false);
    }
    dotenvy::from_path(&path)?;
    tracing::info!(path = %path.display(), "loaded env file");
    Ok(true)
}

fn env_file(dir: &Path) -> PathBuf {
    dir.join("..").join(".env")
}

/// Routes plus the state they share. Dispatch is axum's.
pub struct Application {
    base_path: String,
    router: Router<AppState>,
    state: AppState,
    body_limit: usize,
}

impl Application {
    /// Load the env file next to `dir`, read configuration, and start with base path `/`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        load_env(dir)?;
        let state = AppState::from_env()?;
        Ok(Self::with_state(state))
    }

    pub fn with_state(state: AppState) -> Self {
        Application {
            base_path: "/".into(),
            router: Router::new(),
            state,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Mount every route under `path`. `/` mounts them at the root.
    pub fn set_base_path(&mut self, path: &str) {
        let trimmed = path.trim_matches('/');
        self.base_path = format!("/{}", trimmed);
    }

    pub fn with_base_path(mut self, path: &str) -> Self {
        self.set_base_path(path);
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter<AppState>) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    pub fn nest(mut self, path: &str, router: Router<AppState>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub fn merge(mut self, router: Router<AppState>) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// The finished router with state, base path and body limit applied.
    pub fn into_router(self) -> Router {
        let routes = if self.base_path == "/" {
            self.router
        } else {
            Router::new().nest(&self.base_path, self.router)
        };
        routes
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(RequestBodyLimitLayer::new(self.body_limit))
            .with_state(self.state)
    }

    pub async fn listen(self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("listening on {}", listener.local_addr()?);
        axum::serve(listener, self.into_router()).await
    }
}
