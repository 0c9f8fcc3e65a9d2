//! Custom error types for translation sync operations

use std::time::Duration;
use thiserror::Error;

/// Errors raised while planning, running or pulling translation jobs
#[derive(Error, Debug)]
pub enum SyncError {
    /// Bad or missing configuration, raised before any network call
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// No API token configured, or the service rejected the token
    #[error("Unauthorized: no valid API token")]
    Unauthorized,

    /// Request did not complete within the configured window
    #[error("Request timeout after {after:?}")]
    Timeout {
        after: Duration,
    },

    /// Transport-level failure
    #[error("Network error: {message}")]
    Network {
        message: String,
    },

    /// Non-2xx status or a malformed response body
    #[error("Server error: {status} - {message}")]
    Server {
        status: u16,
        message: String,
    },

    /// File operation error
    #[error("File error: {path} - {message}")]
    File {
        path: String,
        message: String,
    },

    /// Polling gave up before the job reached a terminal state
    #[error("Polling stopped after {attempts} attempts without completion")]
    PollLimitExceeded {
        attempts: u32,
    },

    /// Polling was cancelled by the caller
    #[error("Polling cancelled")]
    Cancelled,

    /// A job was created server-side but the run did not finish
    #[error("Translation job {job_id} did not finish: {source}")]
    JobIncomplete {
        job_id: String,
        #[source]
        source: Box<SyncError>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a malformed response from a successful request
    pub fn malformed(status: u16, message: impl Into<String>) -> Self {
        SyncError::Server {
            status,
            message: message.into(),
        }
    }

    /// Wraps a file-system failure with the path it concerns
    pub fn file(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        SyncError::File {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::validation(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
