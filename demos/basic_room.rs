//! # Basic Room Example
//!
//! Demonstrates a complete FlagDash client lifecycle:
//!
//! 1. Connect to a game server via WebSocket
//! 2. Join a room with a username
//! 3. Start the game (when running as the host)
//! 4. React to questions by picking an option
//! 5. Shut down gracefully on Ctrl+C or disconnect
//!
//! ## Running
//!
//! ```sh
//! # Start a FlagDash server on localhost:8080, create a room "AB12", then:
//! cargo run --example basic_room
//!
//! # Override the defaults:
//! FLAGDASH_URL=ws://my-server:8080/ws FLAGDASH_ROOM=XY99 \
//!     FLAGDASH_USERNAME=carol cargo run --example basic_room
//! ```

use flagdash_client::protocol::{GameMode, RoomDetails};
use flagdash_client::{
    FlagDashClient, FlagDashConfig, FlagDashEvent, QuestionPrompt, WebSocketTransport,
};
use rand::seq::SliceRandom;

/// Default server URL when `FLAGDASH_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:8080/ws";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Initialize tracing. Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("FLAGDASH_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let room_code = std::env::var("FLAGDASH_ROOM").unwrap_or_else(|_| "AB12".to_string());
    let username = std::env::var("FLAGDASH_USERNAME").unwrap_or_else(|_| "rustplayer".to_string());

    // In a full application the room details come from the lobby service
    // over HTTP. Here we assume a freshly created room hosted by us.
    let room = RoomDetails {
        code: room_code.clone(),
        host: username.clone(),
        gamemode: GameMode::Mcq,
        num_questions: 10,
        time_limit_minutes: 5,
        players: Vec::new(),
    };

    tracing::info!("Connecting to {url} (room {room_code})");

    // ── Connect ─────────────────────────────────────────────────────
    let transport = WebSocketTransport::connect(&url).await?;
    let config = FlagDashConfig::new(&username, room);

    // Start the client. This spawns a background task that drives the
    // transport and emits events on `event_rx`.
    let (mut client, mut event_rx) = FlagDashClient::start(transport, config)?;

    // ── Event loop ──────────────────────────────────────────────────
    // Use `tokio::select!` to listen for both game events and Ctrl+C.
    loop {
        tokio::select! {
            // Branch 1: Incoming event from the game (or transport layer).
            event = event_rx.recv() => {
                let Some(event) = event else {
                    // Channel closed — session loop exited.
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    // ── Synthetic: transport connected ───────────────
                    FlagDashEvent::Connected => {
                        tracing::info!("Connected, waiting for the join echo…");
                    }

                    FlagDashEvent::PlayerIdAssigned { player_id } => {
                        tracing::info!("Joined room {} as {player_id}", client.room_code());

                        // As the host, kick the game off right away.
                        if client.is_host() {
                            client.start_game()?;
                            tracing::info!("Start request sent");
                        }
                    }

                    // ── Room lifecycle ───────────────────────────────
                    FlagDashEvent::RosterUpdated { players, .. } => {
                        tracing::info!(
                            "Roster: {}",
                            players
                                .iter()
                                .map(|p| p.name.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                    }

                    FlagDashEvent::CountdownTick { value } => {
                        tracing::info!("Starting in {value}…");
                    }

                    FlagDashEvent::GameStarted => {
                        tracing::info!("Game on!");
                    }

                    // ── Questions ────────────────────────────────────
                    FlagDashEvent::QuestionLoaded { index, total, flag_url, prompt } => {
                        tracing::info!("Question {}/{total}: {flag_url}", index + 1);

                        // Pick something. A real UI would ask the player.
                        let guess = match &prompt {
                            QuestionPrompt::MultipleChoice { options } => options
                                .choose(&mut rand::thread_rng())
                                .cloned()
                                .unwrap_or_default(),
                            QuestionPrompt::MapPick { .. } => "France".to_string(),
                        };
                        tracing::info!("Answering: {guess}");
                        client.submit_answer(guess)?;
                    }

                    FlagDashEvent::AnswerJudged { correct, correct_answer, .. } => {
                        if correct {
                            tracing::info!("Correct!");
                        } else {
                            tracing::info!("Wrong, it was {correct_answer}");
                        }
                    }

                    FlagDashEvent::GameOver { leaderboard } => {
                        tracing::info!("Game over!");
                        for (place, entry) in leaderboard.iter().enumerate() {
                            tracing::info!("  {}. {} — {}", place + 1, entry.name, entry.score);
                        }
                        client.leave()?;
                    }

                    // ── Errors from the server ───────────────────────
                    FlagDashEvent::RoomClosed { message } => {
                        tracing::error!("Room closed: {message}");
                    }

                    // ── Disconnect ───────────────────────────────────
                    FlagDashEvent::Disconnected { reason } => {
                        tracing::warn!("Disconnected: {}", reason.as_deref().unwrap_or("unknown"));
                        break;
                    }
                }
            }

            // Branch 2: Ctrl+C — shut down gracefully.
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Client shut down. Goodbye!");
    Ok(())
}
