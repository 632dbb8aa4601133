//! Error types for the content pipeline.
//!
//! Library crates use [`ContentPipelineError`] via `thiserror`.
//! The CLI wraps this with `color-eyre`; the HTTP server maps [`ErrorKind`]
//! onto response status codes.

use std::path::PathBuf;

/// Top-level error type for all content pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentPipelineError {
    /// Configuration loading or validation error (including a missing API key).
    #[error("{message}")]
    Config { message: String },

    /// Caller-supplied input was rejected before any upstream call.
    #[error("{message}")]
    Validation { message: String },

    /// A pipeline stage failed against the chat-completion endpoint.
    #[error("{agent} error: {detail}")]
    Upstream { agent: &'static str, detail: String },

    /// HTTP client construction or other transport-level setup error.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContentPipelineError>;

/// Coarse classification of an error, used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Validation,
    Upstream,
    Internal,
}

impl ContentPipelineError {
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

    /// Create an upstream error attributed to the named agent.
    pub fn upstream(agent: &'static str, detail: impl Into<String>) -> Self {
        Self::Upstream {
            agent,
            detail: detail.into(),
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
            Self::Config { .. } => ErrorKind::Config,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Network(_) | Self::Io { .. } => ErrorKind::Internal,
        }
    }
}
