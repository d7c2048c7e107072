//! Error types for the presence client.

use kibun_shared::protocol::ProtocolError;
use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the bearer token
    #[error("Unauthorized: the server rejected the token")]
    Unauthorized,

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The handshake did not complete as expected
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// A connection attempt exceeded the configured timeout
    #[error("Connection attempt timed out")]
    Timeout,

    /// No live session to send on
    #[error("Not connected")]
    NotConnected,

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Wire protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
