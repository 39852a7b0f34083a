//! Error types for chimei.
//!
//! Library crates use [`ChimeiError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum ChimeiError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A catalog pattern failed to compile. Fatal at startup.
    #[error("malformed pattern `{name}`: {message}")]
    Pattern { name: String, message: String },

    /// A single strategy failed on a single sentence.
    #[error("strategy `{strategy}` failed: {message}")]
    Strategy { strategy: String, message: String },

    /// Completion service error (HTTP, API, or response parsing).
    #[error("ai service error: {0}")]
    Ai(String),

    /// Entity tagger error (dictionary loading or tagging).
    #[error("tagger error: {0}")]
    Tagger(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad offsets, inconsistent span text, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChimeiError>;

impl ChimeiError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-pattern error for the named pattern.
    pub fn pattern(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Pattern {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a strategy failure for the named strategy.
    pub fn strategy(strategy: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Strategy {
            strategy: strategy.into(),
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
        let err = ChimeiError::config("missing gazetteer");
        assert_eq!(err.to_string(), "config error: missing gazetteer");

        let err = ChimeiError::pattern("city", "unclosed group");
        assert_eq!(err.to_string(), "malformed pattern `city`: unclosed group");

        let err = ChimeiError::strategy("tagger", "model offline");
        assert!(err.to_string().contains("`tagger`"));
    }
}
