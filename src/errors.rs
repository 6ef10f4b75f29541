//! Error types for the quote store, its persistence gateways and the remote source.

use thiserror::Error;

/// User-correctable input problems. Never leaves a partial mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was empty after trimming
    #[error("Please fill in both fields ({field} is empty)")]
    EmptyField { field: &'static str },

    /// An externally supplied quote collides with an existing id
    #[error("A quote with id {0} already exists")]
    DuplicateId(u64),

    /// Import payload is not a JSON array of quote objects
    #[error("Invalid JSON format: {0}")]
    InvalidImport(String),
}

impl ValidationError {
    pub fn invalid_import(message: impl Into<String>) -> Self {
        Self::InvalidImport(message.into())
    }
}

/// Failures talking to the remote source. Logged, retried on the next tick.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport error (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the remote
    #[error("Remote returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Body could not be decoded into a batch
    #[error("Failed to decode remote batch: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RemoteError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// Storage read/write failures. The store logs and swallows these.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
