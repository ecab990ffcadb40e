//! Protocol messages exchanged between the two peers.
//!
//! All messages are serialized as JSON objects tagged by a `type` field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::PlayerId;

/// Messages exchanged over the session bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NetMessage {
    /// Announces the sender's display name and role, once per connection.
    Hello { player_name: String, is_host: bool },

    /// Host begins a round. Carries the answer reference in-band.
    StartRound {
        round: u32,
        question: String,
        think_ms: u64,
        answer: String,
    },

    /// Attempt to claim the answer lock. `client_epoch_ms` is advisory only.
    Buzz {
        player_id: PlayerId,
        client_epoch_ms: i64,
    },

    /// Host's authoritative lock-holder for the current round.
    Lock { winner_id: PlayerId },

    /// Answer submitted by the lock-holder.
    Answer { player_id: PlayerId, text: String },

    /// Host's verdict on the submitted answer.
    Judge { correct: bool, score_delta: i32 },
}

/// Delivery modes offered by the session bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryMode {
    OrderedReliable,
    UnorderedBestEffort,
}

impl NetMessage {
    /// Mode this message is normally sent with.
    pub fn delivery_mode(&self) -> DeliveryMode {
        match self {
            NetMessage::Buzz { .. } => DeliveryMode::UnorderedBestEffort,
            _ => DeliveryMode::OrderedReliable,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NetMessage::Hello { .. } => "hello",
            NetMessage::StartRound { .. } => "startRound",
            NetMessage::Buzz { .. } => "buzz",
            NetMessage::Lock { .. } => "lock",
            NetMessage::Answer { .. } => "answer",
            NetMessage::Judge { .. } => "judge",
        }
    }
}

impl fmt::Display for NetMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetMessage::Hello {
                player_name,
                is_host,
            } => write!(f, "hello({player_name}, host={is_host})"),
            NetMessage::StartRound {
                round, question, ..
            } => write!(f, "startRound({round}, {question:?})"),
            NetMessage::Buzz {
                player_id,
                client_epoch_ms,
            } => write!(f, "buzz({player_id}, {client_epoch_ms})"),
            NetMessage::Lock { winner_id } => write!(f, "lock({winner_id})"),
            NetMessage::Answer { player_id, text } => write!(f, "answer({player_id}, {text:?})"),
            NetMessage::Judge {
                correct,
                score_delta,
            } => write!(f, "judge({correct}, {score_delta:+})"),
        }
    }
}

/// Serialize a message. Falls back to an empty payload on failure.
pub fn encode(msg: &NetMessage) -> Vec<u8> {
    match serde_json::to_vec(msg) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(kind = msg.kind(), %err, "failed to encode message");
            Vec::new()
        }
    }
}

/// Deserialize a message. Malformed, empty or unknown payloads yield `None`.
pub fn decode(bytes: &[u8]) -> Option<NetMessage> {
    match serde_json::from_slice(bytes) {
        Ok(msg) => Some(msg),
        Err(err) => {
            tracing::debug!(len = bytes.len(), %err, "discarding undecodable payload");
            None
        }
    }
}

/// Default WebSocket port.
pub const DEFAULT_PORT: u16 = 8712;

/// Default think time announced with each round.
pub const DEFAULT_THINK_MS: u64 = 3000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let msg = NetMessage::StartRound {
            round: 1,
            question: "Q".to_string(),
            think_ms: 3000,
            answer: "A".to_string(),
        };
        let json = String::from_utf8(encode(&msg)).unwrap();
        assert!(json.contains("\"type\":\"startRound\""));
        assert!(json.contains("\"thinkMs\":3000"));

        let msg = NetMessage::Buzz {
            player_id: PlayerId::from("bob"),
            client_epoch_ms: 42,
        };
        let json = String::from_utf8(encode(&msg)).unwrap();
        assert!(json.contains("\"playerId\":\"bob\""));
        assert!(json.contains("\"clientEpochMs\":42"));
        assert_eq!(decode(json.as_bytes()), Some(msg));
    }

    #[test]
    fn test_decode_known_payload() {
        let msg = decode(br#"{"type":"lock","winnerId":"alice"}"#);
        assert_eq!(
            msg,
            Some(NetMessage::Lock {
                winner_id: PlayerId::from("alice")
            })
        );
    }

    #[test]
    fn test_decode_is_robust() {
        assert_eq!(decode(b""), None);
        assert_eq!(decode(b"\xff\xfe\x00garbage"), None);
        assert_eq!(decode(b"{\"type\":\"teleport\"}"), None);
        assert_eq!(decode(b"{\"type\":\"lock\"}"), None);
        assert_eq!(decode(b"[1,2,3]"), None);
    }

    #[test]
    fn test_buzz_is_best_effort() {
        let buzz = NetMessage::Buzz {
            player_id: PlayerId::from("a"),
            client_epoch_ms: 0,
        };
        assert_eq!(buzz.delivery_mode(), DeliveryMode::UnorderedBestEffort);
        let lock = NetMessage::Lock {
            winner_id: PlayerId::from("a"),
        };
        assert_eq!(lock.delivery_mode(), DeliveryMode::OrderedReliable);
    }
}
