//! Error types for the FlagDash client.

use thiserror::Error;

/// Errors that can occur when using the FlagDash client.
#[derive(Debug, Error)]
pub enum FlagDashError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection, but the client is not connected.
    #[error("not connected to server")]
    NotConnected,

    /// Attempted a host-only operation from a non-host client.
    #[error("only the room host may start the game")]
    NotHost,

    /// The username does not meet the room's length requirements.
    #[error("username must be between 4 and 10 characters, got {length}")]
    InvalidUsername {
        /// Character count of the rejected username.
        length: usize,
    },

    /// The room code is empty or otherwise unusable.
    #[error("room code must not be empty")]
    InvalidRoom,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for FlagDash client operations.
pub type Result<T> = std::result::Result<T, FlagDashError>;
