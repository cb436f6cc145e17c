//! Error types for CommentKeeper.
//!
//! Library crates use [`CommentKeeperError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Severity model: only [`CommentKeeperError::Connection`] aborts a
//! reconciliation pass. `Summarization`, `Persistence`, and
//! `MissingMetadata` are per-item — the engine recovers them as Skip
//! decisions and keeps going.

use std::path::PathBuf;

/// Top-level error type for all CommentKeeper operations.
#[derive(Debug, thiserror::Error)]
pub enum CommentKeeperError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Annotation store unreachable. Pass-fatal.
    #[error("store connection error: {0}")]
    Connection(String),

    /// Annotation store query/write error after a connection was established.
    #[error("storage error: {0}")]
    Storage(String),

    /// Summarizer call failed (network, auth, rate limit, malformed response).
    #[error("summarization error: {0}")]
    Summarization(String),

    /// Excerpt file write or annotation record write failed for one item.
    #[error("persistence error for '{item}': {message}")]
    Persistence { item: String, message: String },

    /// An item is missing the metadata required to process it.
    #[error("missing metadata for '{item}': {message}")]
    MissingMetadata { item: String, message: String },

    /// Data validation error (malformed front matter, bad record shape, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CommentKeeperError>;

impl CommentKeeperError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a persistence error tagged with the item it belongs to.
    pub fn persistence(item: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Persistence {
            item: item.into(),
            message: msg.into(),
        }
    }

    /// Create a missing-metadata error tagged with the item it belongs to.
    pub fn missing_metadata(item: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MissingMetadata {
            item: item.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should abort the whole pass.
    ///
    /// Everything except a store connection failure is recoverable at the
    /// item level.
    pub fn is_pass_fatal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
