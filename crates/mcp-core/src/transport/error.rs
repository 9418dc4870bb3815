//! Transport error types

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection closed
    #[error("connection closed")]
    ConnectionClosed,

    /// Invalid message format
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Request rejected by a transport-level auth/origin check
    #[error("rejected: {0}")]
    Rejected(String),

    /// Server bind error
    #[error("failed to bind server: {0}")]
    BindFailed(String),
}
