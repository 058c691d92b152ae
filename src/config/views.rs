//! Where view templates live and which layout wraps them.

use std::path::{Path, PathBuf};

pub const DEFAULT_VIEW_PATH: &str = "views";
pub const DEFAULT_LAYOUT: &str = "layout.html";
pub const VIEW_EXTENSION: &str = "html";

#[derive(Clone, Debug)]
pub struct ViewConfig {
    pub view_path: PathBuf,
    /// File name of the layout inside `view_path`. `None` renders views unwrapped.
    pub layout: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            view_path: PathBuf::from(DEFAULT_VIEW_PATH),
            layout: Some(DEFAULT_LAYOUT.to_string()),
        }
    }
}

impl ViewConfig {
    pub fn new(view_path: impl Into<PathBuf>) -> Self {
        ViewConfig {
            view_path: view_path.into(),
            ..Default::default()
        }
    }

    pub fn with_layout(mut self, layout: Option<&str>) -> Self {
        self.layout = layout.filter(|l| !l.is_empty()).map(str::to_string);
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `VIEW_PATH` and `VIEW_LAYOUT`; an empty `VIEW_LAYOUT` disables the layout.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let view_path = lookup("VIEW_PATH").unwrap_or_else(|| DEFAULT_VIEW_PATH.to_string());
        let layout = lookup("VIEW_LAYOUT").unwrap_or_else(|| DEFAULT_LAYOUT.to_string());
        ViewConfig::new(view_path).with_layout(Some(&layout))
    }

    /// `<view_path>/<name>.html`
    pub fn view_file(&self, name: &str) -> PathBuf {
        self.view_path.join(format!("{}.{}", name, VIEW_EXTENSION))
    }

    pub fn layout_file(&self) -> Option<PathBuf> {
        self.layout.as_deref().map(|l| self.view_path.join(l))
    }

    pub fn root(&self) -> &Path {
        &self.view_path
    }
}
