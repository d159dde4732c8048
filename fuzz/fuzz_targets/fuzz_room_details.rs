#![no_main]

use libfuzzer_sys::fuzz_target;

use flagdash_client::protocol::RoomDetails;
use flagdash_client::session::GameSession;

fuzz_target!(|data: &[u8]| {
    // Exercise the raw-byte deserialization path (includes serde_json's
    // own UTF-8 validation and error handling for invalid sequences).
    if let Ok(details) = serde_json::from_slice::<RoomDetails>(data) {
        // Seeding a session from arbitrary service output must not panic.
        let session = GameSession::new("fuzzer", &details);
        let _ = session.roster().snapshot();
        let _ = details.time_limit();
    }
});
