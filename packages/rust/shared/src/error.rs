//! Error types for fieldfill.
//!
//! Library crates use [`FieldFillError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all fieldfill operations.
#[derive(Debug, thiserror::Error)]
pub enum FieldFillError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP transport error (request never produced a response).
    #[error("network error: {0}")]
    Network(String),

    /// The completion backend answered, but not with a usable completion.
    #[error("{0}")]
    Provider(String),

    /// The completion backend rejected the credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The fan-out over a batch could not be started at all.
    #[error("batch dispatch failed: {0}")]
    BatchDispatch(String),

    /// A fill result could not be applied to the document.
    #[error("apply error: {0}")]
    Apply(String),

    /// The message channel between page and background closed early.
    #[error("message bus error: {0}")]
    Bus(String),

    /// A fill session is already outstanding for this page.
    #[error("a fill is already in progress on this page")]
    Busy,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad prompt, bad key format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FieldFillError>;

impl FieldFillError {
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
        let err = FieldFillError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = FieldFillError::validation("system prompt is empty");
        assert!(err.to_string().contains("system prompt is empty"));
    }

    #[test]
    fn provider_error_displays_bare_message() {
        // Provider messages end up verbatim in FillResult.error.
        let err = FieldFillError::Provider("HTTP error! status: 500".into());
        assert_eq!(err.to_string(), "HTTP error! status: 500");
    }

    #[test]
    fn busy_error_message() {
        assert!(FieldFillError::Busy.to_string().contains("already in progress"));
    }
}
