//! The room session state machine.
//!
//! [`GameSession`] owns everything a connected client knows about its
//! room: the roster, the lifecycle phase, the active question and the
//! answer guard. It is a pure state machine. Inbound server events and
//! application commands go in, [`Effect`]s come out, and the driver (the
//! session loop in [`client`](crate::client)) performs the sends, event
//! deliveries and timer arming the effects describe. Nothing here does
//! I/O, which is what makes the whole lifecycle testable without a
//! server.
//!
//! Phases move strictly forward:
//!
//! ```text
//! Lobby ──▶ Countdown ──▶ InQuestion ◀──▶ Reveal ──▶ Ended
//!   └──────────┴──────────────┴────────────┴──▶ Ended (room error)
//! ```
//!
//! Unexpected input never panics and never moves the machine backwards;
//! it is logged and dropped.

use std::time::Duration;

use tracing::{debug, warn};

use crate::answer::{self, ActiveQuestion, AnswerFlow};
use crate::event::FlagDashEvent;
use crate::protocol::{
    AnswerResultPayload, AnswerSubmission, ClientMessage, GameMode, PlayerJoinedPayload,
    PlayerLeftPayload, QuestionPayload, QuestionRequest, RoomDetails, ScoreUpdatedPayload,
    ServerEvent,
};
use crate::roster::Roster;

/// Lifecycle phase of a room session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the host to start the game.
    Lobby,
    /// The pre-game countdown is running.
    Countdown,
    /// A question is requested or on screen, awaiting an answer.
    InQuestion,
    /// The judgement for the last answer is on screen.
    Reveal,
    /// The game finished or the room became unusable. Terminal.
    Ended,
}

/// Application requests, delivered through the client handle.
#[derive(Debug, Clone)]
pub enum Command {
    /// Ask the server to start the game. Host only.
    StartGame,
    /// Submit an answer for the current question.
    SubmitAnswer(String),
    /// Leave the room and end the session.
    Leave,
}

/// Side effects a transition asks the driver to perform, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Serialize and transmit a message to the server.
    Send(ClientMessage),
    /// Deliver an event to the application.
    Emit(FlagDashEvent),
    /// Arm the single advance timer. Replaces any armed timer.
    ScheduleAdvance(Duration),
    /// Disarm the advance timer if armed.
    CancelAdvance,
    /// Close the transport and end the session loop.
    Close { reason: Option<String> },
}

/// State machine for one client's view of one room.
#[derive(Debug)]
pub struct GameSession {
    username: String,
    room_code: String,
    host: String,
    game_mode: GameMode,
    question_count: u32,
    roster: Roster,
    phase: Phase,
    /// Connection id assigned by the server, learned from our own
    /// `playerJoined` echo.
    player_id: Option<String>,
    /// Index of the question currently requested or on screen.
    current_index: u32,
    question: Option<ActiveQuestion>,
    answer_flow: AnswerFlow,
    /// Whether the question phase has ever begun. Makes the start
    /// transition idempotent across `countdown 0` and `gameStarted`.
    started: bool,
}

impl GameSession {
    /// Creates a session for `username` in the room described by the
    /// room service. Players already listed are seeded into the roster
    /// under their usernames until the server assigns ids.
    pub fn new(username: impl Into<String>, room: &RoomDetails) -> Self {
        let mut roster = Roster::new();
        for player in &room.players {
            roster.seed_player(&player.username, player.score);
        }
        Self {
            username: username.into(),
            room_code: room.code.clone(),
            host: room.host.clone(),
            game_mode: room.gamemode,
            question_count: room.num_questions,
            roster,
            phase: Phase::Lobby,
            player_id: None,
            current_index: 0,
            question: None,
            answer_flow: AnswerFlow::new(),
            started: false,
        }
    }

    /// The announcement sent as the first message after connecting.
    pub fn join_message(&self) -> ClientMessage {
        ClientMessage::JoinRoom {
            username: self.username.clone(),
            room_id: self.room_code.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether this client is the room host.
    pub fn is_host(&self) -> bool {
        self.username == self.host
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn current_question_index(&self) -> u32 {
        self.current_index
    }

    // ── Inbound events ──────────────────────────────────────────────

    /// Applies one server event and returns the effects to perform.
    pub fn handle_event(&mut self, event: ServerEvent) -> Vec<Effect> {
        match event {
            ServerEvent::PlayerJoined(payload) => self.handle_player_joined(payload),
            ServerEvent::PlayerLeft(payload) => self.handle_player_left(payload),
            ServerEvent::ScoreUpdated(payload) => self.handle_score_updated(payload),
            ServerEvent::Countdown(value) => self.handle_countdown(value),
            ServerEvent::GameStarted => self.begin_questions(),
            ServerEvent::NewQuestion(payload) => self.handle_new_question(payload),
            ServerEvent::AnswerResult(payload) => self.handle_answer_result(payload),
            ServerEvent::RoomError { message } => self.handle_room_error(message),
        }
    }

    fn handle_player_joined(&mut self, payload: PlayerJoinedPayload) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.player_id.is_none() && payload.username == self.username {
            self.player_id = Some(payload.id.clone());
            effects.push(Effect::Emit(FlagDashEvent::PlayerIdAssigned {
                player_id: payload.id.clone(),
            }));
        }
        self.roster.add_player(&payload.id, &payload.username);
        // A join always re-projects the roster, even when it was a
        // duplicate, so late subscribers converge on the same view.
        effects.push(self.roster_changed());
        effects
    }

    fn handle_player_left(&mut self, payload: PlayerLeftPayload) -> Vec<Effect> {
        if self.roster.remove_player(&payload.id, &payload.username) {
            vec![self.roster_changed()]
        } else {
            Vec::new()
        }
    }

    fn handle_score_updated(&mut self, payload: ScoreUpdatedPayload) -> Vec<Effect> {
        let key = match (&payload.id, &payload.username) {
            (Some(id), _) if self.roster.contains(id) => Some(id.clone()),
            (_, Some(name)) => self.roster.id_by_name(name).map(str::to_owned),
            _ => None,
        };
        let Some(key) = key else {
            warn!(
                id = ?payload.id,
                username = ?payload.username,
                "ignoring score update for unknown player"
            );
            return Vec::new();
        };
        // No explicit total on the wire means one point was awarded.
        let new_score = match payload.score {
            Some(score) => score,
            None => self.roster.score_of(&key).map_or(1, |s| s + 1),
        };
        if self.roster.update_score(&key, new_score) {
            vec![self.roster_changed()]
        } else {
            Vec::new()
        }
    }

    fn handle_countdown(&mut self, value: u32) -> Vec<Effect> {
        if self.started || self.phase == Phase::Ended {
            debug!(value, "ignoring countdown tick outside the lobby");
            return Vec::new();
        }
        if self.phase == Phase::Lobby {
            self.phase = Phase::Countdown;
        }
        let mut effects = vec![Effect::Emit(FlagDashEvent::CountdownTick { value })];
        if value == 0 {
            effects.extend(self.begin_questions());
        }
        effects
    }

    /// Enters the question phase and requests question zero. Reached
    /// from both the terminal countdown tick and the `gameStarted`
    /// event; only the first arrival does anything.
    fn begin_questions(&mut self) -> Vec<Effect> {
        if self.started {
            debug!("ignoring duplicate game start");
            return Vec::new();
        }
        if self.phase == Phase::Ended {
            debug!("ignoring game start after session end");
            return Vec::new();
        }
        self.started = true;
        self.answer_flow.reset();
        if self.question_count == 0 {
            self.phase = Phase::Ended;
            return vec![
                Effect::Emit(FlagDashEvent::GameStarted),
                Effect::Emit(FlagDashEvent::GameOver {
                    leaderboard: self.roster.snapshot().leaderboard,
                }),
            ];
        }
        self.phase = Phase::InQuestion;
        self.current_index = 0;
        let mut effects = vec![Effect::Emit(FlagDashEvent::GameStarted)];
        effects.extend(self.question_request(0));
        effects
    }

    fn handle_new_question(&mut self, payload: QuestionPayload) -> Vec<Effect> {
        if self.phase == Phase::Ended {
            debug!("ignoring question after session end");
            return Vec::new();
        }
        if !self.started {
            warn!("ignoring question before game start");
            return Vec::new();
        }
        let index = payload.index.unwrap_or(self.current_index);
        if index != self.current_index {
            warn!(
                expected = self.current_index,
                received = index,
                "question index out of sequence, following the server"
            );
            self.current_index = index;
        }
        let question = answer::prepare_question(self.game_mode, index, payload);
        let event = FlagDashEvent::QuestionLoaded {
            index,
            total: self.question_count,
            flag_url: question.flag_url.clone(),
            prompt: question.prompt.clone(),
        };
        self.question = Some(question);
        self.answer_flow.reset();
        self.phase = Phase::InQuestion;
        // Supersedes any reveal still on screen.
        vec![Effect::CancelAdvance, Effect::Emit(event)]
    }

    fn handle_answer_result(&mut self, result: AnswerResultPayload) -> Vec<Effect> {
        if self.phase == Phase::Ended {
            debug!("ignoring answer result after session end");
            return Vec::new();
        }
        let Some(question) = &self.question else {
            warn!("ignoring answer result with no active question");
            return Vec::new();
        };
        let correct = answer::is_correct(&result);
        self.phase = Phase::Reveal;
        vec![
            Effect::Emit(FlagDashEvent::AnswerJudged {
                question_index: question.index,
                correct,
                correct_answer: result.correct_answer,
                chosen_answer: result.chosen_answer,
            }),
            Effect::ScheduleAdvance(answer::reveal_delay(self.game_mode)),
        ]
    }

    fn handle_room_error(&mut self, message: String) -> Vec<Effect> {
        if self.phase == Phase::Ended {
            debug!(%message, "ignoring room error after session end");
            return Vec::new();
        }
        warn!(%message, "room error, ending the session");
        self.phase = Phase::Ended;
        vec![
            Effect::CancelAdvance,
            Effect::Emit(FlagDashEvent::RoomClosed { message }),
        ]
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Applies one application command and returns the effects to
    /// perform.
    pub fn handle_command(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::StartGame => self.handle_start_game(),
            Command::SubmitAnswer(answer) => self.handle_submit(answer),
            Command::Leave => self.handle_leave(),
        }
    }

    fn handle_start_game(&mut self) -> Vec<Effect> {
        if !self.is_host() {
            warn!("ignoring start request from a non-host client");
            return Vec::new();
        }
        if self.phase != Phase::Lobby {
            warn!(phase = ?self.phase, "ignoring start request outside the lobby");
            return Vec::new();
        }
        vec![Effect::Send(ClientMessage::LoadGame)]
    }

    fn handle_submit(&mut self, answer: String) -> Vec<Effect> {
        if self.phase != Phase::InQuestion {
            warn!(phase = ?self.phase, "ignoring answer outside the question phase");
            return Vec::new();
        }
        let Some(question) = &self.question else {
            warn!("ignoring answer submitted before the question loaded");
            return Vec::new();
        };
        let Some(player_id) = self.player_id.clone() else {
            warn!("ignoring answer submitted before the player id was assigned");
            return Vec::new();
        };
        if !self.answer_flow.try_submit() {
            warn!(index = question.index, "ignoring second answer for the same question");
            return Vec::new();
        }
        // The judgement moves us to the reveal; until it arrives the
        // submission locks out further answers.
        let submission = AnswerSubmission {
            room_id: self.room_code.clone(),
            player_id,
            question_index: question.index,
            answer,
        };
        self.phase = Phase::Reveal;
        vec![Effect::Send(ClientMessage::ValidateAnswer { data: submission })]
    }

    fn handle_leave(&mut self) -> Vec<Effect> {
        self.phase = Phase::Ended;
        vec![
            Effect::Send(ClientMessage::Leave),
            Effect::Close {
                reason: Some("left room".to_string()),
            },
        ]
    }

    // ── Timers ──────────────────────────────────────────────────────

    /// Called by the driver when the advance timer fires. Requests the
    /// next question, or ends the game when the sequence is exhausted.
    pub fn advance_due(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Reveal {
            debug!(phase = ?self.phase, "ignoring advance timer outside the reveal");
            return Vec::new();
        }
        let next = self.current_index + 1;
        if next >= self.question_count {
            self.phase = Phase::Ended;
            return vec![Effect::Emit(FlagDashEvent::GameOver {
                leaderboard: self.roster.snapshot().leaderboard,
            })];
        }
        self.current_index = next;
        self.question = None;
        self.answer_flow.reset();
        self.phase = Phase::InQuestion;
        self.question_request(next).into_iter().collect()
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn question_request(&self, index: u32) -> Option<Effect> {
        match &self.player_id {
            Some(player_id) => Some(Effect::Send(ClientMessage::GetNewQuestion {
                data: QuestionRequest {
                    room_id: self.room_code.clone(),
                    player_id: player_id.clone(),
                    question_number: index,
                },
            })),
            None => {
                warn!(index, "cannot request a question before the player id is assigned");
                None
            }
        }
    }

    fn roster_changed(&self) -> Effect {
        let snapshot = self.roster.snapshot();
        Effect::Emit(FlagDashEvent::RosterUpdated {
            players: snapshot.players,
            leaderboard: snapshot.leaderboard,
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::RoomPlayer;

    fn room(gamemode: GameMode, num_questions: u32) -> RoomDetails {
        RoomDetails {
            code: "AB12".to_string(),
            host: "alice".to_string(),
            gamemode,
            num_questions,
            time_limit_minutes: 5,
            players: Vec::new(),
        }
    }

    fn joined(username: &str, details: &RoomDetails) -> GameSession {
        let mut session = GameSession::new(username, details);
        let effects = session.handle_event(ServerEvent::PlayerJoined(PlayerJoinedPayload {
            id: format!("{username}-id"),
            username: username.to_string(),
            score: 0,
        }));
        assert!(!effects.is_empty());
        session
    }

    fn question(index: u32, answer: &str) -> QuestionPayload {
        QuestionPayload {
            index: Some(index),
            flag_url: "https://flagcdn.com/w320/fr.png".to_string(),
            options: vec![
                answer.to_string(),
                "Italy".to_string(),
                "Spain".to_string(),
                "Belgium".to_string(),
            ],
            answer: answer.to_string(),
            coordinates: None,
        }
    }

    fn sends(effects: &[Effect]) -> Vec<&ClientMessage> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn own_join_echo_assigns_player_id() {
        let details = room(GameMode::Mcq, 10);
        let mut session = GameSession::new("alice", &details);
        assert_eq!(session.player_id(), None);

        let effects = session.handle_event(ServerEvent::PlayerJoined(PlayerJoinedPayload {
            id: "p1".to_string(),
            username: "alice".to_string(),
            score: 0,
        }));

        assert_eq!(session.player_id(), Some("p1"));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Emit(FlagDashEvent::PlayerIdAssigned { player_id }) if player_id == "p1"
        )));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Emit(FlagDashEvent::RosterUpdated { .. }))));
    }

    #[test]
    fn seeded_players_survive_the_echo() {
        let mut details = room(GameMode::Mcq, 10);
        details.players = vec![
            RoomPlayer {
                username: "alice".to_string(),
                score: 0,
            },
            RoomPlayer {
                username: "bob".to_string(),
                score: 2,
            },
        ];
        let session = joined("alice", &details);
        assert_eq!(session.roster().len(), 2);
        assert_eq!(session.roster().score_of("bob"), Some(2));
    }

    #[test]
    fn countdown_zero_starts_and_requests_question_zero() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);

        for value in [3, 2, 1] {
            let effects = session.handle_event(ServerEvent::Countdown(value));
            assert_eq!(
                effects,
                vec![Effect::Emit(FlagDashEvent::CountdownTick { value })]
            );
            assert_eq!(session.phase(), Phase::Countdown);
        }

        let effects = session.handle_event(ServerEvent::Countdown(0));
        assert_eq!(session.phase(), Phase::InQuestion);
        assert!(effects.contains(&Effect::Emit(FlagDashEvent::CountdownTick { value: 0 })));
        assert!(effects.contains(&Effect::Emit(FlagDashEvent::GameStarted)));
        let sent = sends(&effects);
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            sent[0],
            ClientMessage::GetNewQuestion { data } if data.question_number == 0 && data.player_id == "alice-id"
        ));
    }

    #[test]
    fn game_started_is_idempotent() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);

        let first = session.handle_event(ServerEvent::GameStarted);
        assert!(first.contains(&Effect::Emit(FlagDashEvent::GameStarted)));
        assert_eq!(sends(&first).len(), 1);
        assert_eq!(session.current_question_index(), 0);

        let second = session.handle_event(ServerEvent::GameStarted);
        assert!(second.is_empty());
        assert_eq!(session.current_question_index(), 0);
    }

    #[test]
    fn countdown_zero_then_game_started_requests_once() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);

        let from_countdown = session.handle_event(ServerEvent::Countdown(0));
        assert_eq!(sends(&from_countdown).len(), 1);

        let from_started = session.handle_event(ServerEvent::GameStarted);
        assert!(from_started.is_empty());
    }

    #[test]
    fn mismatched_question_index_follows_the_server() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);

        let effects = session.handle_event(ServerEvent::NewQuestion(question(4, "France")));
        assert_eq!(session.current_question_index(), 4);
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Emit(FlagDashEvent::QuestionLoaded { index: 4, total: 10, .. })
        )));
    }

    #[test]
    fn question_without_index_uses_the_requested_one() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);

        let mut payload = question(0, "France");
        payload.index = None;
        let effects = session.handle_event(ServerEvent::NewQuestion(payload));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Emit(FlagDashEvent::QuestionLoaded { index: 0, .. })
        )));
    }

    #[test]
    fn submit_sends_once_and_locks() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);
        session.handle_event(ServerEvent::NewQuestion(question(0, "France")));

        let effects = session.handle_command(Command::SubmitAnswer("France".to_string()));
        let sent = sends(&effects);
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            sent[0],
            ClientMessage::ValidateAnswer { data } if data.question_index == 0
                && data.answer == "France"
                && data.room_id == "AB12"
        ));
        assert_eq!(session.phase(), Phase::Reveal);

        let again = session.handle_command(Command::SubmitAnswer("Spain".to_string()));
        assert!(again.is_empty());
    }

    #[test]
    fn submit_without_question_is_ignored() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);

        // Question requested but the payload has not arrived yet.
        let effects = session.handle_command(Command::SubmitAnswer("France".to_string()));
        assert!(effects.is_empty());
        assert_eq!(session.phase(), Phase::InQuestion);
    }

    #[test]
    fn answer_result_reveals_and_schedules_the_advance() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);
        session.handle_event(ServerEvent::NewQuestion(question(0, "France")));
        session.handle_command(Command::SubmitAnswer("France".to_string()));

        let effects = session.handle_event(ServerEvent::AnswerResult(AnswerResultPayload {
            correct_answer: "France".to_string(),
            chosen_answer: "France".to_string(),
        }));

        assert_eq!(session.phase(), Phase::Reveal);
        assert!(effects.contains(&Effect::Emit(FlagDashEvent::AnswerJudged {
            question_index: 0,
            correct: true,
            correct_answer: "France".to_string(),
            chosen_answer: "France".to_string(),
        })));
        assert!(effects.contains(&Effect::ScheduleAdvance(Duration::from_millis(2000))));
    }

    #[test]
    fn map_mode_reveal_is_longer() {
        let details = room(GameMode::Map, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);
        let mut payload = question(0, "Japan");
        payload.options = Vec::new();
        session.handle_event(ServerEvent::NewQuestion(payload));
        session.handle_command(Command::SubmitAnswer("Japan".to_string()));

        let effects = session.handle_event(ServerEvent::AnswerResult(AnswerResultPayload {
            correct_answer: "Japan".to_string(),
            chosen_answer: "Japan".to_string(),
        }));
        assert!(effects.contains(&Effect::ScheduleAdvance(Duration::from_millis(4000))));
    }

    #[test]
    fn advance_requests_the_next_question() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);
        session.handle_event(ServerEvent::NewQuestion(question(0, "France")));
        session.handle_command(Command::SubmitAnswer("France".to_string()));
        session.handle_event(ServerEvent::AnswerResult(AnswerResultPayload {
            correct_answer: "France".to_string(),
            chosen_answer: "France".to_string(),
        }));

        let effects = session.advance_due();
        assert_eq!(session.phase(), Phase::InQuestion);
        assert_eq!(session.current_question_index(), 1);
        let sent = sends(&effects);
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            sent[0],
            ClientMessage::GetNewQuestion { data } if data.question_number == 1
        ));
    }

    #[test]
    fn last_question_ends_the_game_without_a_request() {
        let details = room(GameMode::Mcq, 3);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);

        for index in 0..3 {
            session.handle_event(ServerEvent::NewQuestion(question(index, "France")));
            session.handle_command(Command::SubmitAnswer("France".to_string()));
            session.handle_event(ServerEvent::AnswerResult(AnswerResultPayload {
                correct_answer: "France".to_string(),
                chosen_answer: "France".to_string(),
            }));
            let effects = session.advance_due();
            if index < 2 {
                assert_eq!(sends(&effects).len(), 1);
            } else {
                assert!(sends(&effects).is_empty());
                assert!(effects
                    .iter()
                    .any(|e| matches!(e, Effect::Emit(FlagDashEvent::GameOver { .. }))));
            }
        }
        assert_eq!(session.phase(), Phase::Ended);
    }

    #[test]
    fn stale_advance_timer_is_ignored() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);

        assert!(session.advance_due().is_empty());
        assert_eq!(session.phase(), Phase::InQuestion);
    }

    #[test]
    fn score_without_total_awards_one_point() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);

        let effects = session.handle_event(ServerEvent::ScoreUpdated(ScoreUpdatedPayload {
            id: None,
            username: Some("alice".to_string()),
            score: None,
        }));
        assert!(!effects.is_empty());
        assert_eq!(session.roster().score_of("alice-id"), Some(1));
    }

    #[test]
    fn score_with_total_overwrites() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);

        session.handle_event(ServerEvent::ScoreUpdated(ScoreUpdatedPayload {
            id: Some("alice-id".to_string()),
            username: None,
            score: Some(7),
        }));
        assert_eq!(session.roster().score_of("alice-id"), Some(7));
    }

    #[test]
    fn score_for_unknown_player_is_ignored() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);

        let effects = session.handle_event(ServerEvent::ScoreUpdated(ScoreUpdatedPayload {
            id: Some("ghost".to_string()),
            username: Some("ghost".to_string()),
            score: Some(3),
        }));
        assert!(effects.is_empty());
        assert_eq!(session.roster().len(), 1);
    }

    #[test]
    fn room_error_ends_the_session_in_any_phase() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::GameStarted);
        session.handle_event(ServerEvent::NewQuestion(question(0, "France")));

        let effects = session.handle_event(ServerEvent::RoomError {
            message: "Room not found".to_string(),
        });
        assert_eq!(session.phase(), Phase::Ended);
        assert!(effects.contains(&Effect::CancelAdvance));
        assert!(effects.contains(&Effect::Emit(FlagDashEvent::RoomClosed {
            message: "Room not found".to_string(),
        })));

        // Everything after the end is dropped.
        assert!(session
            .handle_event(ServerEvent::NewQuestion(question(1, "Spain")))
            .is_empty());
        assert!(session.handle_event(ServerEvent::GameStarted).is_empty());
    }

    #[test]
    fn non_host_start_request_is_ignored() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("bob", &details);

        assert!(session.handle_command(Command::StartGame).is_empty());
    }

    #[test]
    fn host_start_request_sends_loadgame() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);

        let effects = session.handle_command(Command::StartGame);
        assert_eq!(effects, vec![Effect::Send(ClientMessage::LoadGame)]);

        // Once the countdown is running the request would be a replay.
        session.handle_event(ServerEvent::Countdown(3));
        assert!(session.handle_command(Command::StartGame).is_empty());
    }

    #[test]
    fn leave_sends_and_closes() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);

        let effects = session.handle_command(Command::Leave);
        assert_eq!(
            effects,
            vec![
                Effect::Send(ClientMessage::Leave),
                Effect::Close {
                    reason: Some("left room".to_string()),
                },
            ]
        );
        assert_eq!(session.phase(), Phase::Ended);
    }

    #[test]
    fn roster_events_update_the_leaderboard_projection() {
        let details = room(GameMode::Mcq, 10);
        let mut session = joined("alice", &details);
        session.handle_event(ServerEvent::PlayerJoined(PlayerJoinedPayload {
            id: "p2".to_string(),
            username: "bob".to_string(),
            score: 0,
        }));

        let effects = session.handle_event(ServerEvent::ScoreUpdated(ScoreUpdatedPayload {
            id: Some("p2".to_string()),
            username: None,
            score: Some(5),
        }));
        let Some(Effect::Emit(FlagDashEvent::RosterUpdated { players, leaderboard })) =
            effects.first()
        else {
            panic!("expected a roster update");
        };
        // Arrival order on the membership list, score order on the board.
        assert_eq!(players[0].name, "alice");
        assert_eq!(leaderboard[0].name, "bob");
        assert_eq!(leaderboard[0].score, 5);
    }
}
