//! The RTSP session state machine shared by [`crate::server::ServerWorker`]
//! and [`crate::client::ClientSession`] (server receives requests, client
//! emits them — but both walk the same three states).

use rand::Rng;

/// Lower bound of the random session-id range (inclusive).
const SESSION_ID_MIN: u32 = 100_000;
/// Upper bound of the random session-id range (inclusive).
const SESSION_ID_MAX: u32 = 999_999;

/// RTSP session state.
///
/// ```text
/// INIT --SETUP--> READY --PLAY--> PLAYING
///                  READY <--PAUSE-- PLAYING
/// any non-INIT --TEARDOWN--> INIT (connection terminates)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Ready,
    Playing,
}

/// Generate a random session id in `100000..=999999`, per the Session
/// record's `session_id` field.
pub fn generate_session_id() -> u32 {
    rand::rng().random_range(SESSION_ID_MIN..=SESSION_ID_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_in_range() {
        for _ in 0..1000 {
            let id = generate_session_id();
            assert!((SESSION_ID_MIN..=SESSION_ID_MAX).contains(&id));
        }
    }
}
