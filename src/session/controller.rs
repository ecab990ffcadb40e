//! Session controller.
//!
//! The single owner of all session state. Transport events, local player
//! actions and timer expiries all arrive as [`SessionCommand`]s on one inbox
//! and are handled strictly one at a time; after each command the controller
//! publishes a fresh [`SessionSnapshot`] for the presentation layer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::models::PlayerId;
use crate::protocol::{decode, encode, DeliveryMode, NetMessage};

use super::bus::{BusEvent, BusEvents, SessionBus};
use super::election::elect;
use super::matchmaking::{MatchStatus, Matchmaker, SearchTimer};
use super::round::{Effect, LogLevel, RoundMachine, RoundPhase};

/// Everything the controller reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Event reported by the transport.
    Bus(BusEvent),
    /// Host asks to post the next question.
    StartRound,
    Buzz,
    SubmitAnswer(String),
    RequestMatchmaking,
    CancelMatchmaking,
    /// Posted by the matchmaking timer.
    MatchmakingTimedOut { search_id: u64 },
    Shutdown,
}

/// Read-only view of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub local_id: PlayerId,
    /// Connected remote participants, in arrival order.
    pub remotes: Vec<PlayerId>,
    pub is_host: bool,
    /// 0 until the first round starts.
    pub round_index: u32,
    pub question: Option<String>,
    pub think_ms: u64,
    pub lock_holder: Option<PlayerId>,
    pub phase: RoundPhase,
    pub match_status: MatchStatus,
    /// Set once a participant disconnected; the session does not resume.
    pub ended: bool,
    pub log: Vec<String>,
}

impl SessionSnapshot {
    fn initial(local_id: PlayerId) -> Self {
        Self {
            local_id,
            remotes: Vec::new(),
            is_host: false,
            round_index: 0,
            question: None,
            think_ms: 0,
            lock_holder: None,
            phase: RoundPhase::NoRound,
            match_status: MatchStatus::Idle,
            ended: false,
            log: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.remotes.is_empty() && !self.ended
    }

    /// Whether the local player may submit an answer.
    pub fn holds_lock(&self) -> bool {
        self.lock_holder.as_ref() == Some(&self.local_id)
    }
}

/// Cloneable front door to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Queue a command. Returns false once the session has shut down.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn buzz(&self) -> bool {
        self.send(SessionCommand::Buzz)
    }

    pub fn submit_answer(&self, text: impl Into<String>) -> bool {
        self.send(SessionCommand::SubmitAnswer(text.into()))
    }

    pub fn request_round_start(&self) -> bool {
        self.send(SessionCommand::StartRound)
    }

    pub fn request_matchmaking(&self) -> bool {
        self.send(SessionCommand::RequestMatchmaking)
    }

    pub fn cancel_matchmaking(&self) -> bool {
        self.send(SessionCommand::CancelMatchmaking)
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionCommand::Shutdown)
    }

    /// Sink for a transport serving this session.
    pub fn events(&self) -> BusEvents {
        BusEvents::new(self.tx.clone())
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }
}

/// Receiving end of a session's inbox, consumed by [`SessionController::new`].
pub struct Mailbox {
    rx: mpsc::UnboundedReceiver<SessionCommand>,
    inbox: mpsc::WeakUnboundedSender<SessionCommand>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl Mailbox {
    #[cfg(test)]
    pub(crate) fn try_next(&mut self) -> Option<SessionCommand> {
        self.rx.try_recv().ok()
    }
}

/// Create the inbox of a session for `local_id`.
///
/// The handle can be given to transports (via [`SessionHandle::events`])
/// before the controller exists.
pub fn mailbox(local_id: PlayerId) -> (SessionHandle, Mailbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::initial(local_id));
    let mailbox = Mailbox {
        rx,
        inbox: tx.downgrade(),
        snapshot_tx,
    };
    let handle = SessionHandle {
        tx,
        snapshot: snapshot_rx,
    };
    (handle, mailbox)
}

/// Owns the session and drives the round state machine.
pub struct SessionController {
    display_name: String,
    matchmaking_timeout: Duration,
    round: RoundMachine,
    remotes: Vec<PlayerId>,
    log: Vec<String>,
    match_status: MatchStatus,
    ended: bool,
    search: SearchTimer,
    bus: Arc<dyn SessionBus>,
    matchmaker: Arc<dyn Matchmaker>,
    rx: mpsc::UnboundedReceiver<SessionCommand>,
    inbox: mpsc::WeakUnboundedSender<SessionCommand>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        mailbox: Mailbox,
        bus: Arc<dyn SessionBus>,
        matchmaker: Arc<dyn Matchmaker>,
    ) -> Self {
        let round = RoundMachine::new(config.player_id, config.questions, config.think_ms);
        let controller = Self {
            display_name: config.display_name,
            matchmaking_timeout: config.matchmaking_timeout,
            round,
            remotes: Vec::new(),
            log: Vec::new(),
            match_status: MatchStatus::Idle,
            ended: false,
            search: SearchTimer::default(),
            bus,
            matchmaker,
            rx: mailbox.rx,
            inbox: mailbox.inbox,
            snapshot_tx: mailbox.snapshot_tx,
        };
        controller.publish();
        controller
    }

    /// Process commands until `Shutdown` or until every handle is dropped.
    pub async fn run(mut self) {
        info!(local = %self.round.local_id(), "session started");

        while let Some(command) = self.rx.recv().await {
            if command == SessionCommand::Shutdown {
                break;
            }
            self.handle(command);
        }

        if self.search.disarm() {
            self.matchmaker.cancel();
        }
        info!(local = %self.round.local_id(), "session stopped");
    }

    /// Apply one command and publish the resulting state.
    pub fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Bus(event) => self.on_bus_event(event),
            SessionCommand::StartRound => {
                if self.reject_if_ended("round start") {
                    return;
                }
                let effects = self.round.start_round();
                self.apply(effects);
            }
            SessionCommand::Buzz => {
                if self.reject_if_ended("buzz") {
                    return;
                }
                let effects = self.round.buzz(chrono::Utc::now().timestamp_millis());
                self.apply(effects);
            }
            SessionCommand::SubmitAnswer(text) => {
                if self.reject_if_ended("answer") {
                    return;
                }
                let effects = self.round.submit_answer(text);
                self.apply(effects);
            }
            SessionCommand::RequestMatchmaking => self.request_matchmaking(),
            SessionCommand::CancelMatchmaking => self.cancel_matchmaking(),
            SessionCommand::MatchmakingTimedOut { search_id } => self.on_search_timeout(search_id),
            SessionCommand::Shutdown => {}
        }
        self.publish();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            local_id: self.round.local_id().clone(),
            remotes: self.remotes.clone(),
            is_host: self.round.is_host(),
            round_index: self.round.round_index(),
            question: self.round.question().map(str::to_string),
            think_ms: self.round.think_ms(),
            lock_holder: self.round.lock_holder().cloned(),
            phase: self.round.phase(),
            match_status: self.match_status.clone(),
            ended: self.ended,
            log: self.log.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn reject_if_ended(&mut self, action: &str) -> bool {
        if self.ended {
            self.record(LogLevel::Warn, format!("session ended, {action} ignored"));
            self.publish();
        }
        self.ended
    }

    fn on_bus_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::Connected(id) => self.on_connected(id),
            BusEvent::Disconnected(id) => self.on_disconnected(id),
            BusEvent::Received { from, payload } => self.on_payload(from, &payload),
            BusEvent::MatchFound => {
                self.search.disarm();
                self.match_status = MatchStatus::Matched;
                self.record(LogLevel::Info, "match found, waiting for players".to_string());
            }
            BusEvent::MatchFailed(reason) => {
                self.search.disarm();
                self.record(LogLevel::Warn, format!("matchmaking failed: {reason}"));
                self.match_status = MatchStatus::Failed(reason);
            }
        }
    }

    fn on_connected(&mut self, id: PlayerId) {
        if self.ended {
            self.record(LogLevel::Warn, format!("{id} connected after session end, ignored"));
            return;
        }
        if &id == self.round.local_id() || self.remotes.contains(&id) {
            self.record(LogLevel::Debug, format!("{id} already connected"));
            return;
        }

        self.record(LogLevel::Info, format!("player connected: {id}"));
        self.remotes.push(id);

        let was_host = self.round.is_host();
        let is_host = elect(self.round.local_id(), &self.remotes);
        self.round.set_host(is_host);
        self.record(
            LogLevel::Info,
            format!(
                "role decided: {} with {} remote(s)",
                if is_host { "host" } else { "client" },
                self.remotes.len()
            ),
        );

        let hello = NetMessage::Hello {
            player_name: self.display_name.clone(),
            is_host,
        };
        self.dispatch(&hello, hello.delivery_mode());

        if is_host && !was_host {
            self.record(LogLevel::Info, "hosting, starting first round".to_string());
            let effects = self.round.start_round();
            self.apply(effects);
        } else if !is_host {
            self.record(LogLevel::Info, "waiting for the host's question".to_string());
        }
    }

    fn on_disconnected(&mut self, id: PlayerId) {
        if !self.remotes.contains(&id) {
            self.record(LogLevel::Debug, format!("disconnect from unknown player {id}"));
            return;
        }

        self.remotes.retain(|r| r != &id);
        let is_host = elect(self.round.local_id(), &self.remotes);
        self.round.set_host(is_host);
        self.ended = true;
        self.record(LogLevel::Warn, format!("{id} disconnected, session ended"));
    }

    fn on_payload(&mut self, from: PlayerId, payload: &[u8]) {
        if self.ended {
            self.record(LogLevel::Debug, format!("payload from {from} after session end dropped"));
            return;
        }
        let Some(message) = decode(payload) else {
            self.record(
                LogLevel::Warn,
                format!("undecodable payload from {from}, {} bytes", payload.len()),
            );
            return;
        };

        debug!(%from, %message, "received");
        let effects = self.round.on_message(&from, message);
        self.apply(effects);
    }

    fn request_matchmaking(&mut self) {
        if !self.remotes.is_empty() || self.ended {
            self.record(LogLevel::Warn, "already in a session, matchmaking ignored".to_string());
            return;
        }

        // Drop any earlier request before starting a new one.
        self.matchmaker.cancel();
        let search_id = self.search.arm(self.matchmaking_timeout, self.inbox.clone());
        self.match_status = MatchStatus::Searching;
        self.record(
            LogLevel::Info,
            format!(
                "matchmaking started (search {search_id}, timeout {}s)",
                self.matchmaking_timeout.as_secs()
            ),
        );
        self.matchmaker.find_match();
    }

    fn cancel_matchmaking(&mut self) {
        if self.search.disarm() {
            self.matchmaker.cancel();
            self.match_status = MatchStatus::Cancelled;
            self.record(LogLevel::Info, "matchmaking cancelled".to_string());
        } else {
            self.record(LogLevel::Debug, "no pending matchmaking to cancel".to_string());
        }
    }

    fn on_search_timeout(&mut self, search_id: u64) {
        if !self.search.expire(search_id) {
            self.record(LogLevel::Debug, format!("stale timeout for search {search_id}"));
            return;
        }
        self.matchmaker.cancel();
        self.match_status = MatchStatus::NoMatchFound;
        self.record(LogLevel::Warn, "matchmaking timed out, no match found".to_string());
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { message, mode } => self.dispatch(&message, mode),
                Effect::Log { level, text } => self.record(level, text),
            }
        }
    }

    /// Fire-and-forget send; failures are logged and not retried.
    fn dispatch(&mut self, message: &NetMessage, mode: DeliveryMode) {
        match self.bus.send(encode(message), mode) {
            Ok(()) => debug!(%message, ?mode, "sent"),
            Err(err) => self.record(LogLevel::Warn, format!("send {} failed: {err}", message.kind())),
        }
    }

    fn record(&mut self, level: LogLevel, text: String) {
        match level {
            LogLevel::Debug => debug!("{text}"),
            LogLevel::Info => info!("{text}"),
            LogLevel::Warn => warn!("{text}"),
        }
        self.log.push(text);
    }
}
