//! Wire types for the FlagDash room protocol.
//!
//! Outbound messages share one internally tagged envelope: an `event` field
//! naming the message, with either flat fields (`joinRoom`) or a nested `data`
//! object (`get_new_question`, `validate_answer`).
//!
//! Inbound traffic is looser. The server emits three envelope forms:
//!
//! - `{"event": E, "data": D}` where `D` is an object or a bare integer,
//! - `{"event": E}` with no payload at all (`gameStarted`),
//! - `{"error": MSG}` with no event tag.
//!
//! [`decode_server_event`] normalizes all three into [`ServerEvent`] in two
//! stages: a raw envelope parse, then a per-tag payload decode. Historical tag
//! and key spellings (`playerDisconnected`, `score`, `ID`, `Username`) are
//! folded into the canonical variants here so nothing downstream has to know
//! they exist.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Game modes ──────────────────────────────────────────────────────

/// How questions are presented and answered in a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GameMode {
    /// Pick the country name from four options.
    #[default]
    #[serde(rename = "MCQ", alias = "mcq")]
    Mcq,
    /// Pick the country on a world map.
    #[serde(rename = "MAP", alias = "map")]
    Map,
}

// ── Room details ────────────────────────────────────────────────────

/// A player entry as listed by the room service, before the socket has
/// assigned connection ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomPlayer {
    pub username: String,
    #[serde(default)]
    pub score: u32,
}

/// Room metadata as returned by the room service (create, join, or get).
///
/// The embedding application obtains this over HTTP before opening the
/// socket and hands it to the client unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomDetails {
    /// Join code identifying the room.
    pub code: String,
    /// Username of the room host. Only the host may start the game.
    pub host: String,
    /// Question presentation mode. Older service versions omit this
    /// field; multiple choice is assumed.
    #[serde(default)]
    pub gamemode: GameMode,
    /// Total number of questions the room will ask.
    #[serde(rename = "numQuestions")]
    pub num_questions: u32,
    /// Room lifetime in minutes, as configured at creation.
    #[serde(rename = "timeLimit")]
    pub time_limit_minutes: u32,
    /// Players already in the room at the time of the snapshot.
    #[serde(default)]
    pub players: Vec<RoomPlayer>,
}

impl RoomDetails {
    /// Room lifetime as a [`Duration`].
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(u64::from(self.time_limit_minutes) * 60)
    }
}

// ── Outbound messages ───────────────────────────────────────────────

/// Payload for the `get_new_question` client message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRequest {
    #[serde(rename = "roomID")]
    pub room_id: String,
    #[serde(rename = "playerID")]
    pub player_id: String,
    /// Zero-based index of the requested question.
    pub question_number: u32,
}

/// Payload for the `validate_answer` client message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerSubmission {
    #[serde(rename = "roomID")]
    pub room_id: String,
    #[serde(rename = "playerID")]
    pub player_id: String,
    /// Zero-based index of the question being answered.
    pub question_index: u32,
    /// The option or country name the player chose.
    pub answer: String,
}

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum ClientMessage {
    /// Announce this player to the room (MUST be the first message).
    #[serde(rename = "joinRoom")]
    JoinRoom {
        username: String,
        #[serde(rename = "roomID")]
        room_id: String,
    },
    /// Ask the server to start the countdown. Host only.
    #[serde(rename = "loadgame")]
    LoadGame,
    /// Request the question at `question_number`.
    #[serde(rename = "get_new_question")]
    GetNewQuestion { data: QuestionRequest },
    /// Submit an answer for server-side judgement.
    #[serde(rename = "validate_answer")]
    ValidateAnswer { data: AnswerSubmission },
    /// Announce an orderly departure before closing the connection.
    #[serde(rename = "leave")]
    Leave,
}

// ── Inbound events ──────────────────────────────────────────────────

/// Payload for the `playerJoined` server event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerJoinedPayload {
    /// Connection id assigned by the server.
    #[serde(alias = "ID", alias = "Id", alias = "playerID")]
    pub id: String,
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(default)]
    pub score: u32,
}

/// Payload for the `playerLeft` server event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerLeftPayload {
    #[serde(alias = "ID", alias = "Id", alias = "playerID")]
    pub id: String,
    #[serde(alias = "Username")]
    pub username: String,
}

/// Payload for the `scoreUpdated` server event.
///
/// The server identifies the player by id, by username, or both, and may
/// omit the new total entirely, which means "one point was awarded".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreUpdatedPayload {
    #[serde(default, alias = "ID", alias = "Id", alias = "playerID")]
    pub id: Option<String>,
    #[serde(default, alias = "Username")]
    pub username: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
}

/// Map coordinates for a question subject.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

/// Payload for the `new_question` server event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionPayload {
    /// Zero-based index of this question. Authoritative when present;
    /// older server versions omit it and rely on request order.
    #[serde(default)]
    pub index: Option<u32>,
    /// URL of the flag image to display.
    pub flag_url: String,
    /// Candidate country names. Empty in map mode.
    #[serde(default)]
    pub options: Vec<String>,
    /// The correct country name.
    pub answer: String,
    /// Where the subject sits on the map. Map mode only.
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Payload for the `answer_result` server event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResultPayload {
    /// The correct answer for the judged question.
    pub correct_answer: String,
    /// The answer this player submitted.
    pub chosen_answer: String,
}

/// Server-to-client events, normalized from the wire envelopes.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A player joined the room (including this client's own join echo).
    PlayerJoined(PlayerJoinedPayload),
    /// A player left or lost their connection.
    PlayerLeft(PlayerLeftPayload),
    /// A player's score changed.
    ScoreUpdated(ScoreUpdatedPayload),
    /// Pre-game countdown tick. Zero means "start".
    Countdown(u32),
    /// The game has started; question zero should be requested.
    GameStarted,
    /// The question this client asked for.
    NewQuestion(QuestionPayload),
    /// Judgement for this client's submitted answer.
    AnswerResult(AnswerResultPayload),
    /// The room rejected this client or is no longer usable.
    RoomError { message: String },
}

// ── Decoding ────────────────────────────────────────────────────────

/// Why an inbound frame could not be turned into a [`ServerEvent`].
///
/// Decode failures are never fatal to a session; callers log and discard
/// the frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON or not a JSON object.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The frame is a JSON object with neither an `event` tag nor an
    /// `error` field.
    #[error("frame has no event tag")]
    MissingEvent,
    /// The event tag is not part of the protocol vocabulary.
    #[error("unknown event tag `{0}`")]
    UnknownEvent(String),
    /// The event tag is known but its payload has the wrong shape.
    #[error("invalid payload for `{event}`: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw inbound envelope, before the per-tag payload decode.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Decodes one inbound text frame into a [`ServerEvent`].
pub fn decode_server_event(text: &str) -> Result<ServerEvent, DecodeError> {
    let envelope: RawEnvelope = serde_json::from_str(text).map_err(DecodeError::Malformed)?;

    if let Some(message) = envelope.error {
        return Ok(ServerEvent::RoomError { message });
    }

    let Some(event) = envelope.event else {
        return Err(DecodeError::MissingEvent);
    };

    let data = envelope.data;
    match event.as_str() {
        "playerJoined" => payload(&event, data).map(ServerEvent::PlayerJoined),
        "playerLeft" | "playerDisconnected" => payload(&event, data).map(ServerEvent::PlayerLeft),
        "scoreUpdated" | "score" => payload(&event, data).map(ServerEvent::ScoreUpdated),
        "countdown" => payload(&event, data).map(ServerEvent::Countdown),
        "gameStarted" => Ok(ServerEvent::GameStarted),
        "new_question" => payload(&event, data).map(ServerEvent::NewQuestion),
        "answer_result" => payload(&event, data).map(ServerEvent::AnswerResult),
        _ => Err(DecodeError::UnknownEvent(event)),
    }
}

fn payload<T: DeserializeOwned>(event: &str, data: serde_json::Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::Payload {
        event: event.to_owned(),
        source,
    })
}
