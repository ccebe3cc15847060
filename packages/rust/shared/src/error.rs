//! Error types for pagewise.
//!
//! Library crates use [`PagewiseError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pagewise operations.
#[derive(Debug, thiserror::Error)]
pub enum PagewiseError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Structured input (outline JSON, bridge messages) could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Inference backend failure (not loaded, crashed, or returned an error).
    #[error("backend error: {0}")]
    Backend(String),

    /// An inference call exceeded its time budget.
    #[error("backend call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty document, bad arguments, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagewiseError>;

impl PagewiseError {
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

    /// Create a backend error from any displayable message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
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
        let err = PagewiseError::config("missing bridge script");
        assert_eq!(err.to_string(), "config error: missing bridge script");

        let err = PagewiseError::backend("model not loaded");
        assert_eq!(err.to_string(), "backend error: model not loaded");

        let err = PagewiseError::Timeout { secs: 30 };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = PagewiseError::io(
            "/tmp/missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.txt"));
    }
}
