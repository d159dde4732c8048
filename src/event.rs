//! Events delivered to the embedding application.
//!
//! Every state change a UI needs to render arrives here as one
//! [`FlagDashEvent`] on the receiver returned by
//! [`FlagDashClient::start`](crate::client::FlagDashClient::start). Events
//! are point-in-time snapshots; rendering the latest one of each kind is
//! always sufficient, no event requires replaying earlier ones.

use crate::answer::QuestionPrompt;
use crate::roster::Player;

/// Events emitted by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagDashEvent {
    /// The transport is open and the join announcement has been sent.
    Connected,

    /// The server echoed this client's own join and assigned its
    /// connection id.
    PlayerIdAssigned { player_id: String },

    /// Room membership or scores changed.
    RosterUpdated {
        /// Players in arrival order, for the membership list.
        players: Vec<Player>,
        /// Players by score descending, ties broken by ascending name.
        leaderboard: Vec<Player>,
    },

    /// Pre-game countdown tick. A value of zero means "start".
    CountdownTick { value: u32 },

    /// The question phase has begun; the first question is on its way.
    GameStarted,

    /// A question is ready to display.
    QuestionLoaded {
        /// Zero-based question index.
        index: u32,
        /// Total questions in this room, for progress display.
        total: u32,
        flag_url: String,
        prompt: QuestionPrompt,
    },

    /// The server judged this client's answer. The reveal stays on
    /// screen until the next [`QuestionLoaded`](Self::QuestionLoaded)
    /// or [`GameOver`](Self::GameOver).
    AnswerJudged {
        question_index: u32,
        /// Whether the chosen answer was the correct one.
        correct: bool,
        correct_answer: String,
        chosen_answer: String,
    },

    /// All questions are consumed; final standings.
    GameOver { leaderboard: Vec<Player> },

    /// The room rejected this client or ended abruptly. The session is
    /// over; the message is suitable for an error dialog.
    RoomClosed { message: String },

    /// The connection is gone and will not recover. Always delivered,
    /// even when the event channel is congested.
    Disconnected { reason: Option<String> },
}
