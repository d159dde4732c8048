//! # FlagDash Client
//!
//! Transport-agnostic Rust client for FlagDash multiplayer game rooms.
//!
//! This crate provides a high-level async client that keeps a room session in
//! sync with a FlagDash game server using JSON text messages over any
//! bidirectional transport.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] trait for any backend
//! - **Wire-compatible** — message types match the server's envelope format exactly
//! - **WebSocket built-in** — default `transport-websocket` feature provides `WebSocketTransport`
//! - **Event-driven** — receive typed [`FlagDashEvent`]s via a channel
//!
//! ## Quick Start
//!
//! ```no_run
//! use flagdash_client::protocol::{GameMode, RoomDetails};
//! use flagdash_client::{FlagDashClient, FlagDashConfig, FlagDashEvent, WebSocketTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Room metadata comes from the lobby service (create or join).
//!     let room = RoomDetails {
//!         code: "AB12".to_string(),
//!         host: "alice".to_string(),
//!         gamemode: GameMode::Mcq,
//!         num_questions: 10,
//!         time_limit_minutes: 5,
//!         players: Vec::new(),
//!     };
//!
//!     let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//!     let config = FlagDashConfig::new("alice", room);
//!     let (client, mut events) = FlagDashClient::start(transport, config)?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             FlagDashEvent::QuestionLoaded { flag_url, .. } => {
//!                 println!("which country is this? {flag_url}");
//!                 client.submit_answer("France")?;
//!             }
//!             FlagDashEvent::GameOver { leaderboard } => {
//!                 println!("final standings: {leaderboard:?}");
//!             }
//!             FlagDashEvent::Disconnected { .. } => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod answer;
#[cfg(feature = "tokio-runtime")]
pub mod client;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod protocol;
pub mod roster;
pub mod session;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use answer::QuestionPrompt;
#[cfg(feature = "tokio-runtime")]
pub use client::{FlagDashClient, FlagDashConfig};
pub use error::FlagDashError;
pub use event::FlagDashEvent;
pub use protocol::{ClientMessage, ServerEvent};
pub use roster::Player;
pub use transport::Transport;
#[cfg(feature = "transport-websocket")]
pub use transports::websocket::WebSocketTransport;
