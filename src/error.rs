//! Error types for the file tailer library.

use thiserror::Error;

/// The main error type for tailing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when opening, stating or reading the tailed file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background polling task panicked or was cancelled.
    #[error("Polling task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// `start` was called outside of a Tokio runtime.
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Rejected configuration values.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// `start` was called before a sink was bound.
    #[error("No sink bound to session")]
    SinkNotBound,

    /// The session was already started.
    #[error("Session already started")]
    AlreadyStarted,

    /// The session was never started.
    #[error("Session not started")]
    NotStarted,

    /// A sink failed to accept a line or the stop notification.
    #[error("Sink error: {message}")]
    Sink { message: String },

    /// The session gave up after too many consecutive I/O faults.
    #[error("Giving up after {attempts} consecutive failures: {last}")]
    TooManyFailures {
        attempts: u32,
        #[source]
        last: std::io::Error,
    },
}

impl Error {
    /// Build a sink error from any displayable message.
    pub fn sink(message: impl Into<String>) -> Self {
        Error::Sink {
            message: message.into(),
        }
    }
}

/// A convenient Result type for tailing operations.
pub type Result<T> = std::result::Result<T, Error>;
