//! Error types for the asset-mapping core.
//!
//! Every failure in this crate is recoverable: validation problems are shown
//! inline, backend failures are surfaced to the operator (and folded into the
//! progress tracker when a task is open), and no-op guards reject empty input
//! before anything is sent to the backend.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the asset-mapping core.
#[derive(Debug, Error)]
pub enum AssetMapError {
    // Validation errors
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Invalid {platform} query: {message}")]
    InvalidQuery { platform: String, message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Local no-op guards
    #[error("Nothing to do: {what} is empty")]
    EmptyInput { what: String },

    #[error("Refusing to start a zero-page export")]
    ZeroPages,

    // Backend errors
    #[error("Backend command {command} failed: {message}")]
    Backend { command: String, message: String },

    #[error("Backend command {command} is not supported")]
    Unsupported { command: String },

    #[error("Backend connection to {addr} lost")]
    ConnectionLost { addr: String },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for asset-mapping operations.
pub type Result<T> = std::result::Result<T, AssetMapError>;

impl From<std::io::Error> for AssetMapError {
    fn from(err: std::io::Error) -> Self {
        AssetMapError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for AssetMapError {
    fn from(err: serde_json::Error) -> Self {
        AssetMapError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl AssetMapError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        AssetMapError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for an empty-input guard.
    pub fn empty(what: impl Into<String>) -> Self {
        AssetMapError::EmptyInput { what: what.into() }
    }

    /// The operator-facing message, without the command prefix for backend errors.
    ///
    /// Backend errors carry the message the backend produced; that text is what
    /// the progress tracker shows when a task fails.
    pub fn user_message(&self) -> String {
        match self {
            AssetMapError::Backend { message, .. } => message.clone(),
            AssetMapError::InvalidQuery { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Check if retrying the triggering action might succeed without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AssetMapError::Backend { .. }
                | AssetMapError::ConnectionLost { .. }
                | AssetMapError::Timeout(_)
        )
    }

    /// True for errors raised locally before anything reached the backend.
    pub fn is_local_guard(&self) -> bool {
        matches!(
            self,
            AssetMapError::EmptyInput { .. }
                | AssetMapError::ZeroPages
                | AssetMapError::Validation { .. }
                | AssetMapError::UnknownPlatform(_)
        )
    }
}
