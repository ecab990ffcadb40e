//! Session settings.

use std::time::Duration;

use crate::models::{PlayerId, QuestionBank};
use crate::protocol::DEFAULT_THINK_MS;
use crate::session::DEFAULT_MATCHMAKING_TIMEOUT;

/// Everything a session needs to know about the local player and the game.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Stable identifier supplied by the identity provider.
    pub player_id: PlayerId,
    /// Name announced in `hello`.
    pub display_name: String,
    /// Think time announced with each round.
    pub think_ms: u64,
    /// Bound on a matchmaking search before it self-cancels.
    pub matchmaking_timeout: Duration,
    pub questions: QuestionBank,
}

impl SessionConfig {
    pub fn new(player_id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let player_id = PlayerId::random();
        Self {
            display_name: player_id.to_string(),
            player_id,
            think_ms: DEFAULT_THINK_MS,
            matchmaking_timeout: DEFAULT_MATCHMAKING_TIMEOUT,
            questions: QuestionBank::default(),
        }
    }
}
