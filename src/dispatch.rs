//! Inbound frame routing.
//!
//! One text frame in, a batch of [`Effect`]s out. Frames that fail to
//! decode are logged with enough context to reconstruct them and then
//! dropped; a broken frame never takes the session down and is never
//! half-applied.

use tracing::warn;

use crate::protocol::{self, DecodeError};
use crate::session::{Effect, GameSession};

/// Decodes one frame and applies it to the session.
pub fn route(session: &mut GameSession, text: &str) -> Vec<Effect> {
    match protocol::decode_server_event(text) {
        Ok(event) => session.handle_event(event),
        Err(DecodeError::Malformed(source)) => {
            warn!(raw = text, "dropping malformed frame: {source}");
            Vec::new()
        }
        Err(DecodeError::MissingEvent) => {
            warn!(raw = text, "dropping frame with no event tag");
            Vec::new()
        }
        Err(DecodeError::UnknownEvent(event)) => {
            warn!(%event, "dropping frame with unknown event tag");
            Vec::new()
        }
        Err(DecodeError::Payload { event, source }) => {
            warn!(%event, raw = text, "dropping frame with invalid payload: {source}");
            Vec::new()
        }
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
    use crate::event::FlagDashEvent;
    use crate::protocol::RoomDetails;

    fn session() -> GameSession {
        let details = RoomDetails {
            code: "AB12".to_string(),
            host: "alice".to_string(),
            gamemode: Default::default(),
            num_questions: 10,
            time_limit_minutes: 5,
            players: Vec::new(),
        };
        GameSession::new("alice", &details)
    }

    #[test]
    fn valid_frame_reaches_the_session() {
        let mut session = session();
        let effects = route(
            &mut session,
            r#"{"event":"playerJoined","data":{"id":"p1","username":"alice","score":0}}"#,
        );
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Emit(FlagDashEvent::PlayerIdAssigned { player_id }) if player_id == "p1"
        )));
    }

    #[test]
    fn untagged_error_reaches_the_session() {
        let mut session = session();
        let effects = route(&mut session, r#"{"error":"Room not found"}"#);
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Emit(FlagDashEvent::RoomClosed { message }) if message == "Room not found"
        )));
    }

    #[test]
    fn malformed_frame_is_dropped() {
        let mut session = session();
        assert!(route(&mut session, "not json at all").is_empty());
        assert_eq!(session.roster().len(), 0);
    }

    #[test]
    fn unknown_tag_is_dropped() {
        let mut session = session();
        assert!(route(&mut session, r#"{"event":"discoMode","data":{}}"#).is_empty());
    }

    #[test]
    fn invalid_payload_is_dropped_without_side_effects() {
        let mut session = session();
        let effects = route(
            &mut session,
            r#"{"event":"playerJoined","data":{"username":42}}"#,
        );
        assert!(effects.is_empty());
        assert_eq!(session.roster().len(), 0);
    }

    #[test]
    fn missing_event_tag_is_dropped() {
        let mut session = session();
        assert!(route(&mut session, r#"{"data":{"id":"p1"}}"#).is_empty());
    }
}
