#![no_main]

use hexcouncil::codec::{Decode, Encode};
use hexcouncil::replay::Recording;
use hexcouncil::{GameState, NullDiagnostics, Session, Transform};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must fail cleanly, whatever decodes must
    // encode again, and a decoded session must play its next day.
    if let Ok(transform) = Transform::from_bytes(data) {
        let _ = transform.to_bytes();
    }
    if let Ok(state) = GameState::from_bytes(data) {
        let _ = state.to_bytes();
    }
    if let Ok(mut session) = Session::from_bytes(data) {
        let _ = session.to_bytes();
        let _ = session.advance(&mut NullDiagnostics);
    }
    if let Ok(recording) = Recording::from_bytes(data) {
        let _ = recording.to_bytes();
    }
});
