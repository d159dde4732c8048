//! Transport abstraction for the FlagDash room protocol.
//!
//! The [`Transport`] trait defines a bidirectional text message channel
//! between the client and the game server. The room protocol is JSON text
//! frames, so every transport implementation must handle message framing
//! internally (WebSocket frames, length-prefixed TCP, and so on).
//!
//! # Connection Setup
//!
//! Connection setup is intentionally NOT part of this trait — different
//! transports have fundamentally different connection parameters. Construct
//! a connected transport externally, then pass it to `FlagDashClient::start`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use flagdash_client::error::FlagDashError;
//! use flagdash_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), FlagDashError> {
//!         // Send the JSON text frame over your transport
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, FlagDashError>> {
//!         // Receive the next JSON text frame
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), FlagDashError> {
//!         // Gracefully shut down the connection
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::FlagDashError;

/// A bidirectional text message transport for the FlagDash room protocol.
///
/// Implementors shuttle serialized JSON strings between the client and the
/// game server. Each call to [`send`](Transport::send) transmits one complete
/// frame; each call to [`recv`](Transport::recv) returns one complete frame.
///
/// # Object Safety
///
/// This trait is object-safe, so `Box<dyn Transport>` works for dynamic
/// dispatch. `FlagDashClient::start` accepts `impl Transport` (monomorphized)
/// for the common case.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is
/// used inside `tokio::select!`. If `recv` is cancelled before completion,
/// calling it again must not lose data. Channel-based implementations (e.g.,
/// wrapping `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`FlagDashError::TransportSend`] if the frame could not be
    /// sent (e.g., connection broken, write buffer full).
    async fn send(&mut self, message: String) -> Result<(), FlagDashError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete frame was received
    /// - `Some(Err(e))` — a transport error occurred (e.g., [`FlagDashError::TransportReceive`])
    /// - `None` — the connection was closed cleanly by the server
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<String, FlagDashError>>;

    /// Close the transport connection gracefully.
    ///
    /// After calling this method, subsequent calls to [`send`](Transport::send)
    /// and [`recv`](Transport::recv) may return errors or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations should
    /// still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), FlagDashError>;
}
