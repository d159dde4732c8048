#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for FlagDash Client integration tests.
//!
//! Provides a channel-based [`MockTransport`] and helper functions for
//! constructing server frames in the exact shapes the game server emits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use flagdash_client::protocol::{GameMode, RoomDetails, RoomPlayer};
use flagdash_client::{FlagDashError, Transport};
use serde_json::json;

// ── MockTransport ───────────────────────────────────────────────────

/// A channel-based mock transport for integration testing.
///
/// Scripted server responses are consumed in order by `recv()`.
/// All messages sent by the client are recorded in `sent`.
pub struct MockTransport {
    /// Scripted server responses (consumed in order by `recv`).
    incoming: VecDeque<Option<Result<String, FlagDashError>>>,
    /// Recorded outgoing messages from the client.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Whether `close()` has been called.
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a new mock transport with the given scripted incoming messages.
    ///
    /// Returns the transport plus shared handles for inspecting sent messages
    /// and whether close was called.
    pub fn new(
        incoming: Vec<Option<Result<String, FlagDashError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), FlagDashError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, FlagDashError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // No more scripted messages — hang forever so the session loop
            // stays alive until shutdown is called.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), FlagDashError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── PushTransport ───────────────────────────────────────────────────

/// A transport fed interactively by the test over a channel.
///
/// The game protocol is request/reply shaped: the server only sends a
/// question after the client asks for one. Pre-scripted frames would arrive
/// too early for those flows, so this transport lets the test push each
/// frame at the moment the real server would send it. Dropping the sender
/// (or pushing `None`) reads as a clean close.
pub struct PushTransport {
    incoming: tokio::sync::mpsc::UnboundedReceiver<Option<Result<String, FlagDashError>>>,
    /// Recorded outgoing messages from the client.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Whether `close()` has been called.
    pub closed: Arc<AtomicBool>,
}

/// Sender half used by tests to feed a [`PushTransport`].
pub type FrameSender = tokio::sync::mpsc::UnboundedSender<Option<Result<String, FlagDashError>>>;

impl PushTransport {
    pub fn new() -> (Self, FrameSender, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let (frames_tx, incoming) = tokio::sync::mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, frames_tx, sent, closed)
    }
}

#[async_trait]
impl Transport for PushTransport {
    async fn send(&mut self, message: String) -> Result<(), FlagDashError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, FlagDashError>> {
        match self.incoming.recv().await {
            Some(item) => item,
            // Sender dropped: the server went away.
            None => None,
        }
    }

    async fn close(&mut self) -> Result<(), FlagDashError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Room fixtures ───────────────────────────────────────────────────

/// A three-question MCQ room hosted by `alice`, with `alice` already listed.
pub fn room_details() -> RoomDetails {
    room_details_with("AB12", "alice", GameMode::Mcq, 3)
}

/// Room details with custom code, host, mode and question count.
pub fn room_details_with(
    code: &str,
    host: &str,
    gamemode: GameMode,
    num_questions: u32,
) -> RoomDetails {
    RoomDetails {
        code: code.into(),
        host: host.into(),
        gamemode,
        num_questions,
        time_limit_minutes: 5,
        players: vec![RoomPlayer {
            username: host.into(),
            score: 0,
        }],
    }
}

// ── Server frame helpers ────────────────────────────────────────────

/// Frame for a `playerJoined` server event.
pub fn player_joined_json(id: &str, username: &str) -> String {
    json!({
        "event": "playerJoined",
        "data": { "id": id, "username": username, "score": 0 },
    })
    .to_string()
}

/// Frame for a `playerLeft` server event.
pub fn player_left_json(id: &str, username: &str) -> String {
    json!({
        "event": "playerLeft",
        "data": { "id": id, "username": username },
    })
    .to_string()
}

/// Frame for a `countdown` tick. The payload is a bare integer.
pub fn countdown_json(value: u32) -> String {
    json!({ "event": "countdown", "data": value }).to_string()
}

/// Frame for the payload-less `gameStarted` event.
pub fn game_started_json() -> String {
    json!({ "event": "gameStarted" }).to_string()
}

/// Frame for a `new_question` event in multiple-choice shape.
pub fn mcq_question_json(index: u32, flag_url: &str, options: &[&str], answer: &str) -> String {
    json!({
        "event": "new_question",
        "data": {
            "index": index,
            "flag_url": flag_url,
            "options": options,
            "answer": answer,
        },
    })
    .to_string()
}

/// Frame for a `new_question` event in map shape (no options, coordinates).
pub fn map_question_json(index: u32, flag_url: &str, answer: &str, lon: f64, lat: f64) -> String {
    json!({
        "event": "new_question",
        "data": {
            "index": index,
            "flag_url": flag_url,
            "answer": answer,
            "coordinates": { "lon": lon, "lat": lat },
        },
    })
    .to_string()
}

/// Frame for an `answer_result` judgement.
pub fn answer_result_json(correct_answer: &str, chosen_answer: &str) -> String {
    json!({
        "event": "answer_result",
        "data": {
            "correct_answer": correct_answer,
            "chosen_answer": chosen_answer,
        },
    })
    .to_string()
}

/// Frame for the bare-increment `score` event: one point for `username`.
pub fn score_awarded_json(username: &str) -> String {
    json!({
        "event": "score",
        "data": { "username": username },
    })
    .to_string()
}

/// Frame for a `scoreUpdated` event carrying an absolute total.
pub fn score_total_json(id: &str, username: &str, score: u32) -> String {
    json!({
        "event": "scoreUpdated",
        "data": { "id": id, "username": username, "score": score },
    })
    .to_string()
}

/// Frame for an untagged room error.
pub fn room_error_json(message: &str) -> String {
    json!({ "error": message }).to_string()
}
