#![forbid(unsafe_code)]

use borf_dom::DomError;
use borf_reactive::ReactiveError;
use thiserror::Error;

/// Everything the renderer can fail with.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid element tag {tag:?}")]
    InvalidTag { tag: String },

    #[error("invalid attribute {name:?}: {reason}")]
    InvalidAttribute { name: String, reason: &'static str },

    #[error("cannot render a value of type {type_name}: {value}")]
    InvalidRenderable {
        type_name: &'static str,
        value: String,
    },

    #[error("duplicate key {key} at positions {first} and {second}")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },

    #[error("no store of type {type_name} is provided in this scope")]
    StoreNotFound { type_name: &'static str },

    #[error("{handle} handle never settled: its render keeps changing its own source")]
    Reentrant { handle: &'static str },

    #[error("view {view} failed: {message}")]
    ViewFailed { view: String, message: String },

    #[error("invalid config value {value:?} for {key}")]
    Config { key: &'static str, value: String },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Reactive(#[from] ReactiveError),

    #[error("config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    /// A free-form error, for view and render functions.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self::Message(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
