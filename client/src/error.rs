//! Error types for the client.

use thiserror::Error;

/// Errors raised while talking to the sync server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected {endpoint}: HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Invalid credentials")]
    Unauthorized,
}

/// Errors raised by a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Engine error: {0}")]
    Engine(#[from] baler_engine::Error),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, SyncError>;
