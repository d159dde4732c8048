#![no_main]

use libfuzzer_sys::fuzz_target;

use flagdash_client::protocol::{decode_server_event, GameMode, RoomDetails};
use flagdash_client::session::GameSession;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let room = RoomDetails {
        code: "FZ01".to_string(),
        host: "fuzzer".to_string(),
        gamemode: GameMode::Mcq,
        num_questions: 3,
        time_limit_minutes: 1,
        players: Vec::new(),
    };
    let mut session = GameSession::new("fuzzer", &room);

    // Treat each line as one inbound frame. Neither the decoder nor the
    // state machine may panic, whatever the frames contain or in whatever
    // order they arrive.
    for line in text.lines() {
        if let Ok(event) = decode_server_event(line) {
            let _ = session.handle_event(event);
            let _ = session.advance_due();
        }
    }
});
