//! Error types for tickerdeck.

use thiserror::Error;

/// The main error type for tickerdeck.
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (preference file, log directory, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable preference storage errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Channel communication errors
    #[error("Channel error: {0}")]
    Channel(String),

    /// Invalid input or state
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Alias for Result with our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new persistence error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a new channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create a new invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if this is a fetch failure that the next poll may recover from.
    ///
    /// Transport failures, non-success statuses and malformed payloads are
    /// all treated the same way: keep the last good data and wait for the
    /// next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Serialization(_) | Self::Channel(_)
        )
    }

    /// Check if this is a "not found / unavailable" answer from the backend.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}
