//! In-memory transport joining two sessions in one process.
//!
//! Both endpoints share one link. Matchmaking pairs them as soon as both
//! sides are searching; best-effort payloads can be made to vanish to
//! exercise the buzz race.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::models::PlayerId;
use crate::protocol::DeliveryMode;
use crate::session::{BusError, BusEvents, Matchmaker, SessionBus};

struct Side {
    id: PlayerId,
    events: BusEvents,
    searching: bool,
}

struct LinkState {
    sides: [Side; 2],
    connected: bool,
    drop_best_effort: bool,
}

/// One end of a loopback link.
#[derive(Clone)]
pub struct LoopbackEndpoint {
    link: Arc<Mutex<LinkState>>,
    side: usize,
}

/// Create both ends of a link between `a` and `b`.
pub fn pair(a: (PlayerId, BusEvents), b: (PlayerId, BusEvents)) -> (LoopbackEndpoint, LoopbackEndpoint) {
    let link = Arc::new(Mutex::new(LinkState {
        sides: [
            Side {
                id: a.0,
                events: a.1,
                searching: false,
            },
            Side {
                id: b.0,
                events: b.1,
                searching: false,
            },
        ],
        connected: false,
        drop_best_effort: false,
    }));
    (
        LoopbackEndpoint {
            link: Arc::clone(&link),
            side: 0,
        },
        LoopbackEndpoint { link, side: 1 },
    )
}

impl LoopbackEndpoint {
    fn state(&self) -> MutexGuard<'_, LinkState> {
        // A poisoned link only means a test thread panicked mid-send.
        self.link.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Connect both sides without going through matchmaking.
    pub fn connect(&self) {
        let mut state = self.state();
        if !state.connected {
            join(&mut state);
        }
    }

    /// Tear the link down; both sides see the other disconnect.
    pub fn disconnect(&self) {
        let mut state = self.state();
        if !state.connected {
            return;
        }
        state.connected = false;
        let [a, b] = &state.sides;
        a.events.disconnected(b.id.clone());
        b.events.disconnected(a.id.clone());
    }

    /// Silently discard every best-effort payload from now on.
    pub fn set_drop_best_effort(&self, drop: bool) {
        self.state().drop_best_effort = drop;
    }
}

fn join(state: &mut LinkState) {
    state.connected = true;
    for side in state.sides.iter_mut() {
        side.searching = false;
    }
    let [a, b] = &state.sides;
    a.events.match_found();
    b.events.match_found();
    a.events.connected(b.id.clone());
    b.events.connected(a.id.clone());
}

impl SessionBus for LoopbackEndpoint {
    fn send(&self, payload: Vec<u8>, mode: DeliveryMode) -> Result<(), BusError> {
        let state = self.state();
        if !state.connected {
            return Err(BusError::NotConnected);
        }
        if mode == DeliveryMode::UnorderedBestEffort && state.drop_best_effort {
            debug!(len = payload.len(), "loopback dropped best-effort payload");
            return Ok(());
        }

        let from = state.sides[self.side].id.clone();
        let peer = &state.sides[1 - self.side];
        if peer.events.received(from, payload) {
            Ok(())
        } else {
            Err(BusError::Closed)
        }
    }
}

impl Matchmaker for LoopbackEndpoint {
    fn find_match(&self) {
        let mut state = self.state();
        if state.connected {
            return;
        }
        state.sides[self.side].searching = true;
        if state.sides.iter().all(|s| s.searching) {
            join(&mut state);
        }
    }

    fn cancel(&self) {
        self.state().sides[self.side].searching = false;
    }
}
