//! Error types for watcher-core operations.
//!
//! Internal code returns [`WatcherError`] through the crate [`Result`] alias.
//! The recorder and the readers never hand these to their callers: the recorder
//! folds them into an [`Outcome`](crate::outcome::Outcome), the readers fall back
//! to empty values.

use std::path::PathBuf;

/// All errors that can occur in watcher-core operations.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Could not determine home directory")]
    HomeDirNotFound,

    #[error("Settings file malformed: {path}: {details}")]
    SettingsMalformed { path: PathBuf, details: String },

    #[error("Cannot install hooks: {0}")]
    PolicyBlocked(String),

    // ─────────────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Hook payload is not valid JSON: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    // ─────────────────────────────────────────────────────────────────────
    // Locking
    // ─────────────────────────────────────────────────────────────────────
    #[error("Registry lock is held by another process: {0}")]
    LockContended(PathBuf),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Platform not supported for this operation: {0}")]
    UnsupportedPlatform(String),
}

impl WatcherError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        WatcherError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        WatcherError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using WatcherError.
pub type Result<T> = std::result::Result<T, WatcherError>;

impl From<WatcherError> for String {
    fn from(err: WatcherError) -> String {
        err.to_string()
    }
}
