#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration-style client tests for the FlagDash Client.
//!
//! Uses the shared transports from `tests/common` to play the server's side
//! of a room session and verify that `FlagDashClient` drives the game
//! correctly: join echo handling, countdown, question rounds, reveal timing
//! and event delivery.

mod common;

use std::time::Duration;

use flagdash_client::protocol::{ClientMessage, GameMode};
use flagdash_client::{
    FlagDashClient, FlagDashConfig, FlagDashError, FlagDashEvent, QuestionPrompt,
};

use common::{
    answer_result_json, countdown_json, game_started_json, map_question_json, mcq_question_json,
    player_joined_json, player_left_json, room_details, room_details_with, room_error_json,
    score_awarded_json, score_total_json, FrameSender, MockTransport, PushTransport,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

/// Start a client for the default room with scripted server frames.
#[allow(clippy::type_complexity)]
fn start_scripted(
    username: &str,
    incoming: Vec<Option<Result<String, FlagDashError>>>,
) -> (
    FlagDashClient,
    tokio::sync::mpsc::Receiver<FlagDashEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let (transport, sent, closed) = MockTransport::new(incoming);
    let config = FlagDashConfig::new(username, room_details());
    let (client, events) = FlagDashClient::start(transport, config).expect("start");
    (client, events, sent, closed)
}

/// Start a client whose server frames are pushed by the test as the
/// conversation unfolds.
#[allow(clippy::type_complexity)]
fn start_pushed(
    config: FlagDashConfig,
) -> (
    FlagDashClient,
    tokio::sync::mpsc::Receiver<FlagDashEvent>,
    FrameSender,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let (transport, frames, sent, closed) = PushTransport::new();
    let (client, events) = FlagDashClient::start(transport, config).expect("start");
    (client, events, frames, sent, closed)
}

fn push(frames: &FrameSender, json: String) {
    frames.send(Some(Ok(json))).expect("push frame");
}

/// Receive the next event, panicking with context if the channel ends.
async fn next_event(rx: &mut tokio::sync::mpsc::Receiver<FlagDashEvent>) -> FlagDashEvent {
    rx.recv().await.expect("event channel ended unexpectedly")
}

/// Consume events up to and including the join echo for this client.
async fn drain_until_joined(rx: &mut tokio::sync::mpsc::Receiver<FlagDashEvent>) -> String {
    let ev = next_event(rx).await;
    assert!(
        matches!(ev, FlagDashEvent::Connected),
        "first event should be Connected, got {ev:?}"
    );
    loop {
        if let FlagDashEvent::PlayerIdAssigned { player_id } = next_event(rx).await {
            return player_id;
        }
    }
}

/// Let the session loop drain pending commands and effects.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ════════════════════════════════════════════════════════════════════
// Join flow
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn join_flow_announces_then_tracks_the_roster() {
    let (mut client, mut events, sent, _closed) = start_scripted(
        "alice",
        vec![
            Some(Ok(player_joined_json("p1", "alice"))),
            Some(Ok(player_joined_json("p2", "bobby"))),
        ],
    );

    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::Connected));

    let ev = next_event(&mut events).await;
    if let FlagDashEvent::PlayerIdAssigned { player_id } = ev {
        assert_eq!(player_id, "p1");
    } else {
        panic!("expected PlayerIdAssigned, got {ev:?}");
    }

    // Own echo upgrades the seeded entry; bobby's join appends.
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::RosterUpdated { players, .. } = ev {
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, "p1");
    } else {
        panic!("expected RosterUpdated, got {ev:?}");
    }
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::RosterUpdated { players, .. } = ev {
        assert_eq!(players.len(), 2);
        assert_eq!(players[1].name, "bobby");
    } else {
        panic!("expected RosterUpdated, got {ev:?}");
    }

    // The join announcement is the very first frame on the wire.
    {
        let messages = sent.lock().unwrap();
        let first: serde_json::Value = serde_json::from_str(&messages[0]).expect("parse join");
        assert_eq!(
            first,
            serde_json::json!({ "event": "joinRoom", "username": "alice", "roomID": "AB12" })
        );
    }

    assert_eq!(client.current_player_id().await.as_deref(), Some("p1"));
    client.shutdown().await;
}

#[tokio::test]
async fn invalid_usernames_never_touch_the_network() {
    for bad in ["abc", "abcdefghijk", "   "] {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let config = FlagDashConfig::new(bad, room_details());
        let result = FlagDashClient::start(transport, config);
        assert!(
            matches!(result, Err(FlagDashError::InvalidUsername { .. })),
            "username {bad:?} should be rejected"
        );
        assert!(sent.lock().unwrap().is_empty());
    }
}

// ════════════════════════════════════════════════════════════════════
// Full game, multiple choice
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn full_mcq_game_flow() {
    let config = FlagDashConfig::new(
        "alice",
        room_details_with("AB12", "alice", GameMode::Mcq, 2),
    );
    let (mut client, mut events, frames, sent, closed) = start_pushed(config);

    // Server echoes our join.
    push(&frames, player_joined_json("p1", "alice"));
    let player_id = drain_until_joined(&mut events).await;
    assert_eq!(player_id, "p1");
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::RosterUpdated { .. }));

    // Host starts the game.
    client.start_game().expect("start_game");
    settle().await;
    assert_eq!(sent.lock().unwrap()[1], r#"{"event":"loadgame"}"#);

    // Countdown runs down to zero, which enters the question phase.
    push(&frames, countdown_json(3));
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::CountdownTick { value: 3 }));
    push(&frames, countdown_json(0));
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::CountdownTick { value: 0 }));
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::GameStarted));

    // Question zero is requested with our assigned id.
    settle().await;
    {
        let messages = sent.lock().unwrap();
        let request: ClientMessage = serde_json::from_str(&messages[2]).expect("parse request");
        assert!(matches!(
            request,
            ClientMessage::GetNewQuestion { ref data }
                if data.question_number == 0 && data.player_id == "p1" && data.room_id == "AB12"
        ));
    }

    // The server delivers it; the prompt carries the shuffled options.
    push(
        &frames,
        mcq_question_json(0, "https://flagcdn.com/w320/fr.png", &["France", "Italy", "Spain", "Belgium"], "France"),
    );
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::QuestionLoaded { index, total, prompt, .. } = ev {
        assert_eq!(index, 0);
        assert_eq!(total, 2);
        let QuestionPrompt::MultipleChoice { options } = prompt else {
            panic!("expected a multiple-choice prompt");
        };
        assert_eq!(options.len(), 4);
        assert!(options.contains(&"France".to_string()));
    } else {
        panic!("expected QuestionLoaded, got {ev:?}");
    }

    // Answer and let the server judge it.
    client.submit_answer("France").expect("submit");
    settle().await;
    {
        let messages = sent.lock().unwrap();
        let submitted: serde_json::Value =
            serde_json::from_str(messages.last().expect("submission")).expect("parse");
        assert_eq!(
            submitted,
            serde_json::json!({
                "event": "validate_answer",
                "data": {
                    "roomID": "AB12",
                    "playerID": "p1",
                    "question_index": 0,
                    "answer": "France",
                },
            })
        );
    }

    push(&frames, answer_result_json("France", "France"));
    let ev = next_event(&mut events).await;
    assert!(matches!(
        ev,
        FlagDashEvent::AnswerJudged { question_index: 0, correct: true, .. }
    ));

    // A point lands on the board while the reveal is up.
    push(&frames, score_awarded_json("alice"));
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::RosterUpdated { leaderboard, .. } = ev {
        assert_eq!(leaderboard[0].score, 1);
    } else {
        panic!("expected RosterUpdated, got {ev:?}");
    }

    // After the two-second reveal the next question is requested.
    let requests_before = sent.lock().unwrap().len();
    tokio::time::sleep(Duration::from_millis(2100)).await;
    {
        let messages = sent.lock().unwrap();
        assert_eq!(messages.len(), requests_before + 1);
        let request: ClientMessage =
            serde_json::from_str(messages.last().expect("request")).expect("parse");
        assert!(matches!(
            request,
            ClientMessage::GetNewQuestion { ref data } if data.question_number == 1
        ));
    }

    // Second (and last) question, answered wrong this time.
    push(
        &frames,
        mcq_question_json(1, "https://flagcdn.com/w320/jp.png", &["Japan", "China", "Laos", "Nepal"], "Japan"),
    );
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::QuestionLoaded { index: 1, .. }));

    client.submit_answer("China").expect("submit");
    settle().await;
    push(&frames, answer_result_json("Japan", "China"));
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::AnswerJudged { correct, correct_answer, chosen_answer, .. } = ev {
        assert!(!correct);
        assert_eq!(correct_answer, "Japan");
        assert_eq!(chosen_answer, "China");
    } else {
        panic!("expected AnswerJudged, got {ev:?}");
    }

    // The sequence is exhausted, so the reveal timer ends the game.
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::GameOver { leaderboard } = ev {
        assert_eq!(leaderboard.len(), 1);
        assert_eq!(leaderboard[0].name, "alice");
        assert_eq!(leaderboard[0].score, 1);
    } else {
        panic!("expected GameOver, got {ev:?}");
    }

    // Leaving announces the departure and closes the transport.
    client.leave().expect("leave");
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::Disconnected { reason } = ev {
        assert_eq!(reason.as_deref(), Some("left room"));
    } else {
        panic!("expected Disconnected, got {ev:?}");
    }
    assert!(events.recv().await.is_none());
    assert_eq!(
        sent.lock().unwrap().last().map(String::as_str),
        Some(r#"{"event":"leave"}"#)
    );
    assert!(closed.load(std::sync::atomic::Ordering::Relaxed));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Map mode
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn map_mode_prompts_coordinates_and_reveals_longer() {
    let config = FlagDashConfig::new(
        "alice",
        room_details_with("MP01", "alice", GameMode::Map, 1),
    );
    let (mut client, mut events, frames, sent, _closed) = start_pushed(config);

    push(&frames, player_joined_json("p1", "alice"));
    drain_until_joined(&mut events).await;
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::RosterUpdated { .. }));

    // No countdown this time; the bare start event works too.
    push(&frames, game_started_json());
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::GameStarted));

    push(
        &frames,
        map_question_json(0, "https://flagcdn.com/w320/jp.png", "Japan", 138.25, 36.20),
    );
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::QuestionLoaded { prompt, .. } = ev {
        let QuestionPrompt::MapPick { coordinates } = prompt else {
            panic!("expected a map prompt");
        };
        let coordinates = coordinates.expect("coordinates");
        assert!((coordinates.lon - 138.25).abs() < f64::EPSILON);
        assert!((coordinates.lat - 36.20).abs() < f64::EPSILON);
    } else {
        panic!("expected QuestionLoaded, got {ev:?}");
    }

    client.submit_answer("Japan").expect("submit");
    settle().await;
    push(&frames, answer_result_json("Japan", "Japan"));
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::AnswerJudged { correct: true, .. }));

    // Map reveals hold for four seconds, not two.
    let sends_before = sent.lock().unwrap().len();
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(sent.lock().unwrap().len(), sends_before);
    assert!(events.try_recv().is_err(), "game should not be over yet");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::GameOver { .. }));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Roster and score wire forms
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn score_total_form_overwrites_the_board() {
    let (mut client, mut events, _sent, _closed) = start_scripted(
        "alice",
        vec![
            Some(Ok(player_joined_json("p1", "alice"))),
            Some(Ok(score_total_json("p1", "alice", 5))),
        ],
    );

    drain_until_joined(&mut events).await;
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::RosterUpdated { .. }));

    let ev = next_event(&mut events).await;
    if let FlagDashEvent::RosterUpdated { leaderboard, .. } = ev {
        assert_eq!(leaderboard[0].score, 5);
    } else {
        panic!("expected RosterUpdated, got {ev:?}");
    }

    client.shutdown().await;
}

#[tokio::test]
async fn departures_shrink_the_roster() {
    let (mut client, mut events, _sent, _closed) = start_scripted(
        "alice",
        vec![
            Some(Ok(player_joined_json("p1", "alice"))),
            Some(Ok(player_joined_json("p2", "bobby"))),
            Some(Ok(player_left_json("p2", "bobby"))),
        ],
    );

    drain_until_joined(&mut events).await;
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::RosterUpdated { .. }));
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::RosterUpdated { ref players, .. } if players.len() == 2));

    let ev = next_event(&mut events).await;
    if let FlagDashEvent::RosterUpdated { players, .. } = ev {
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "alice");
    } else {
        panic!("expected RosterUpdated, got {ev:?}");
    }

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Failure paths
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn room_error_closes_the_room_then_the_connection() {
    let (_client, mut events, _sent, _closed) = start_scripted(
        "alice",
        vec![
            Some(Ok(player_joined_json("p1", "alice"))),
            Some(Ok(room_error_json(
                "Room is full, only 9 members can join in one room",
            ))),
            None,
        ],
    );

    drain_until_joined(&mut events).await;
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::RosterUpdated { .. }));

    let ev = next_event(&mut events).await;
    if let FlagDashEvent::RoomClosed { message } = ev {
        assert!(message.starts_with("Room is full"));
    } else {
        panic!("expected RoomClosed, got {ev:?}");
    }

    // The server hangs up afterwards.
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::Disconnected { reason: None }));
}

#[tokio::test]
async fn transport_failure_surfaces_as_disconnected() {
    let (_client, mut events, _sent, _closed) = start_scripted(
        "alice",
        vec![
            Some(Ok(player_joined_json("p1", "alice"))),
            Some(Err(FlagDashError::TransportReceive(
                "connection reset by peer".to_string(),
            ))),
        ],
    );

    loop {
        if let FlagDashEvent::Disconnected { reason } = next_event(&mut events).await {
            assert!(reason.expect("reason").contains("connection reset by peer"));
            break;
        }
    }
}

#[tokio::test]
async fn leave_announces_and_closes() {
    let (client, mut events, sent, closed) = start_scripted("alice", vec![]);

    let ev = next_event(&mut events).await;
    assert!(matches!(ev, FlagDashEvent::Connected));

    client.leave().expect("leave");
    let ev = next_event(&mut events).await;
    if let FlagDashEvent::Disconnected { reason } = ev {
        assert_eq!(reason.as_deref(), Some("left room"));
    } else {
        panic!("expected Disconnected, got {ev:?}");
    }

    let messages = sent.lock().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1], r#"{"event":"leave"}"#);
    assert!(closed.load(std::sync::atomic::Ordering::Relaxed));
}

// ════════════════════════════════════════════════════════════════════
// Duplicate suppression
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn duplicate_start_signals_request_question_zero_once() {
    let (mut client, mut events, sent, _closed) = start_scripted(
        "alice",
        vec![
            Some(Ok(player_joined_json("p1", "alice"))),
            Some(Ok(countdown_json(0))),
            Some(Ok(game_started_json())),
        ],
    );

    drain_until_joined(&mut events).await;
    loop {
        if matches!(next_event(&mut events).await, FlagDashEvent::GameStarted) {
            break;
        }
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let requests = sent
        .lock()
        .unwrap()
        .iter()
        .filter(|m| m.contains("get_new_question"))
        .count();
    assert_eq!(requests, 1);

    client.shutdown().await;
}

#[tokio::test]
async fn second_submission_for_the_same_question_is_dropped() {
    let (mut client, mut events, sent, _closed) = start_scripted(
        "alice",
        vec![
            Some(Ok(player_joined_json("p1", "alice"))),
            Some(Ok(game_started_json())),
            Some(Ok(mcq_question_json(
                0,
                "https://flagcdn.com/w320/fr.png",
                &["France", "Italy", "Spain", "Belgium"],
                "France",
            ))),
        ],
    );

    drain_until_joined(&mut events).await;
    loop {
        if matches!(
            next_event(&mut events).await,
            FlagDashEvent::QuestionLoaded { .. }
        ) {
            break;
        }
    }

    client.submit_answer("France").expect("first submit");
    client.submit_answer("Spain").expect("second submit queues fine");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let submissions = sent
        .lock()
        .unwrap()
        .iter()
        .filter(|m| m.contains("validate_answer"))
        .count();
    assert_eq!(submissions, 1);

    client.shutdown().await;
}
