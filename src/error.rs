use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for release resolution
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Manifest write error: {0}")]
    Write(String),

    #[error("Tag '{tag}' already exists; refusing to overwrite")]
    TagConflict { tag: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in pyproject-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a parse error with context
    pub fn parse(msg: impl Into<String>) -> Self {
        ReleaseError::Parse(msg.into())
    }

    /// Create a manifest write error with context
    pub fn write(msg: impl Into<String>) -> Self {
        ReleaseError::Write(msg.into())
    }

    /// Create a manifest write error that names the offending file
    pub fn write_at(path: impl Into<PathBuf>, msg: impl std::fmt::Display) -> Self {
        ReleaseError::Write(format!("{}: {}", path.into().display(), msg))
    }

    /// Create a tag conflict error
    pub fn tag_conflict(tag: impl Into<String>) -> Self {
        ReleaseError::TagConflict { tag: tag.into() }
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }
}
