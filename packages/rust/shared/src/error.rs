//! Error types for SiteChat.
//!
//! Library crates use [`SiteChatError`] via `thiserror`.
//! The server binary wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all SiteChat operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteChatError {
    /// Missing or invalid request fields. The caller's fault; never retried.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The page catalog service could not be read or returned garbage.
    #[error("catalog unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A single page could not be retrieved or parsed.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// The text-generation capability failed or returned nothing.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteChatError>;

/// Coarse classification of an error, used for status-code and
/// message-sanitizing decisions at the outer surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Upstream,
    Fetch,
    Generation,
    Internal,
}

impl SiteChatError {
    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::UpstreamUnavailable(_) => ErrorKind::Upstream,
            Self::FetchFailed(_) => ErrorKind::Fetch,
            Self::GenerationFailed(_) => ErrorKind::Generation,
            Self::Config { .. } | Self::Io { .. } => ErrorKind::Internal,
        }
    }

    /// Message safe to show an end user when raw upstream causes are hidden.
    ///
    /// Validation messages are always passed through since they describe the
    /// caller's own input.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation => self.to_string(),
            ErrorKind::Upstream => "site catalog is currently unavailable".into(),
            ErrorKind::Fetch => "failed to retrieve site content".into(),
            ErrorKind::Generation => "failed to generate a response".into(),
            ErrorKind::Internal => "internal server error".into(),
        }
    }
}
