//! Transport error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("authentication failed for user {0}")]
    AuthFailed(String),

    #[error("channel accept failed: {0}")]
    AcceptFailed(String),

    #[error("channel already accepted")]
    AlreadyAccepted,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Other(String),
}
