//! Error types for termgraph.
//!
//! Library crates use [`TermGraphError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all termgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum TermGraphError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the terminology server.
    #[error("network error: {0}")]
    Network(String),

    /// JSON or TSV content could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV serialization error.
    #[error("csv error: {0}")]
    Csv(String),

    /// Data validation error (bad option value, invalid URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TermGraphError>;

impl TermGraphError {
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

impl From<csv::Error> for TermGraphError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TermGraphError::config("chunk_size must be positive");
        assert_eq!(err.to_string(), "config error: chunk_size must be positive");

        let err = TermGraphError::parse("bs.json: expected an array");
        assert!(err.to_string().starts_with("parse error: bs.json"));
    }

    #[test]
    fn io_error_includes_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = TermGraphError::io("/tmp/rels_core.txt", source);
        let msg = err.to_string();
        assert!(msg.contains("rels_core.txt"));
        assert!(msg.contains("gone"));
    }
}
