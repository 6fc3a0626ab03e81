//! Error handling module
//!
//! This module provides unified error handling for the child-bench harness.

use thiserror::Error as ThisError;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the application
#[derive(Debug, ThisError)]
pub enum Error {
    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The worker process could not be started
    #[error("failed to spawn worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A malformed protocol line was received or could not be encoded
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The benchmark script itself failed inside the worker
    #[error("benchmark '{name}' failed: {message}")]
    Script { name: String, message: String },

    /// The worker went away before answering
    #[error("worker for '{name}' exited before responding")]
    WorkerExited { name: String },

    /// The bench was closed before the request was sent
    #[error("bench '{name}' is closed")]
    Closed { name: String },

    /// No response arrived within the allowed time
    #[error("benchmark '{name}' timed out after {timeout:?}")]
    Timeout {
        name: String,
        timeout: std::time::Duration,
    },
}

impl Error {
    /// Create a protocol error with a custom message
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }

    /// The bare message of this error.
    ///
    /// For script failures this is exactly the message raised inside the
    /// worker, without the benchmark name prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Script { message, .. } => message.clone(),
            Error::Protocol(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the failure originated in the benchmark script rather than the harness
    pub fn is_script_error(&self) -> bool {
        matches!(self, Error::Script { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Protocol(err.to_string())
    }
}
