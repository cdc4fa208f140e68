//! Error types for PureLearn.
//!
//! Library crates use [`PurelearnError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all PureLearn operations.
#[derive(Debug, thiserror::Error)]
pub enum PurelearnError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Course metadata, front-matter or persisted JSON could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (duplicate slugs, out-of-range quiz score, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A course, topic or subtopic does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PurelearnError>;

impl PurelearnError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PurelearnError::config("content root missing");
        assert_eq!(err.to_string(), "config error: content root missing");

        let err = PurelearnError::validation("quiz total must be positive");
        assert!(err.to_string().contains("quiz total"));

        let err = PurelearnError::NotFound("course 'rust'".into());
        assert_eq!(err.to_string(), "not found: course 'rust'");
    }
}
