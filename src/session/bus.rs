//! Boundary with the session transport.
//!
//! Transports implement [`SessionBus`] for outbound payloads and report
//! everything that happens on the link through [`BusEvents`], which feeds the
//! controller's inbox.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::PlayerId;
use crate::protocol::DeliveryMode;

use super::controller::SessionCommand;

/// Error returned by a transport send.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no peer connected")]
    NotConnected,
    #[error("link closed")]
    Closed,
}

/// Outbound half of the session transport.
///
/// `send` must not block: it hands the payload to the transport and returns.
pub trait SessionBus: Send + Sync {
    fn send(&self, payload: Vec<u8>, mode: DeliveryMode) -> Result<(), BusError>;
}

/// Link-level events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Connected(PlayerId),
    Disconnected(PlayerId),
    Received { from: PlayerId, payload: Vec<u8> },
    MatchFound,
    MatchFailed(String),
}

/// Cloneable sink that transports use to push [`BusEvent`]s into a session.
#[derive(Debug, Clone)]
pub struct BusEvents {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl BusEvents {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { tx }
    }

    /// Returns false once the session has shut down.
    pub fn emit(&self, event: BusEvent) -> bool {
        self.tx.send(SessionCommand::Bus(event)).is_ok()
    }

    pub fn connected(&self, id: PlayerId) -> bool {
        self.emit(BusEvent::Connected(id))
    }

    pub fn disconnected(&self, id: PlayerId) -> bool {
        self.emit(BusEvent::Disconnected(id))
    }

    pub fn received(&self, from: PlayerId, payload: Vec<u8>) -> bool {
        self.emit(BusEvent::Received { from, payload })
    }

    pub fn match_found(&self) -> bool {
        self.emit(BusEvent::MatchFound)
    }

    pub fn match_failed(&self, reason: impl Into<String>) -> bool {
        self.emit(BusEvent::MatchFailed(reason.into()))
    }
}
