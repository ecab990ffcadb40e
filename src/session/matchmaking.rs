//! Matchmaking requests and their timeout.

use std::time::Duration;

use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;

use super::controller::SessionCommand;

/// Default bound on a matchmaking search.
pub const DEFAULT_MATCHMAKING_TIMEOUT: Duration = Duration::from_secs(20);

/// Finds an opponent. Outcomes are reported through
/// [`BusEvents`](super::BusEvents): `match_found`/`match_failed`, then
/// `connected` for each peer.
pub trait Matchmaker: Send + Sync {
    fn find_match(&self);

    /// Abort an ongoing search. Must be safe to call when nothing is pending.
    fn cancel(&self);
}

/// Progress of the matchmaking search, as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchStatus {
    #[default]
    Idle,
    Searching,
    Matched,
    NoMatchFound,
    Cancelled,
    Failed(String),
}

impl MatchStatus {
    pub fn label(&self) -> &str {
        match self {
            MatchStatus::Idle => "idle",
            MatchStatus::Searching => "searching",
            MatchStatus::Matched => "matched",
            MatchStatus::NoMatchFound => "no match found",
            MatchStatus::Cancelled => "cancelled",
            MatchStatus::Failed(reason) => reason,
        }
    }
}

struct PendingSearch {
    id: u64,
    timer: JoinHandle<()>,
}

/// Timeout for the single pending search.
///
/// The pending timer is taken exactly once, whichever of cancel, match or
/// expiry comes first.
#[derive(Default)]
pub(crate) struct SearchTimer {
    next_id: u64,
    pending: Option<PendingSearch>,
}

impl SearchTimer {
    /// Replace any pending search with a new one that posts
    /// `MatchmakingTimedOut` into `inbox` after `timeout`.
    pub(crate) fn arm(&mut self, timeout: Duration, inbox: WeakUnboundedSender<SessionCommand>) -> u64 {
        self.disarm();
        self.next_id += 1;
        let search_id = self.next_id;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(tx) = inbox.upgrade() {
                let _ = tx.send(SessionCommand::MatchmakingTimedOut { search_id });
            }
        });
        self.pending = Some(PendingSearch {
            id: search_id,
            timer,
        });
        search_id
    }

    /// Drop the pending search. Returns false if nothing was pending.
    pub(crate) fn disarm(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Consume the pending search if `search_id` is still current.
    pub(crate) fn expire(&mut self, search_id: u64) -> bool {
        if self.pending.as_ref().is_some_and(|p| p.id == search_id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_with_search_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = SearchTimer::default();
        let id = timer.arm(Duration::from_secs(5), tx.downgrade());
        assert!(timer.is_pending());

        match rx.recv().await {
            Some(SessionCommand::MatchmakingTimedOut { search_id }) => assert_eq!(search_id, id),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(timer.expire(id));
        assert!(!timer.expire(id));
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_is_idempotent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = SearchTimer::default();
        timer.arm(Duration::from_secs(5), tx.downgrade());
        assert!(timer.disarm());
        assert!(!timer.disarm());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_makes_old_id_stale() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timer = SearchTimer::default();
        let first = timer.arm(Duration::from_secs(5), tx.downgrade());
        let second = timer.arm(Duration::from_secs(5), tx.downgrade());
        assert_ne!(first, second);
        assert!(!timer.expire(first));
        assert!(timer.expire(second));
    }
}
