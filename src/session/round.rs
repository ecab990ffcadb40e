//! Round state machine.
//!
//! Owns the current round and decides every transition. It performs no I/O:
//! each operation returns the [`Effect`]s the controller must carry out, in
//! order.
//!
//! ```text
//! NoRound ──▶ QuestionPosted ──▶ Locked ──▶ Judged
//!                   ▲                          │
//!                   └──────── next round ──────┘
//! ```

use crate::models::{PlayerId, QuestionBank};
use crate::protocol::{DeliveryMode, NetMessage};

/// Phase of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    #[default]
    NoRound,
    QuestionPosted,
    Locked,
    Judged,
}

/// Severity of a log effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

/// Output of a state machine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Broadcast a message to every other participant.
    Send {
        message: NetMessage,
        mode: DeliveryMode,
    },
    /// Append an entry to the session log.
    Log { level: LogLevel, text: String },
}

impl Effect {
    fn send(message: NetMessage) -> Self {
        let mode = message.delivery_mode();
        Effect::Send { message, mode }
    }

    fn info(text: impl Into<String>) -> Self {
        Effect::Log {
            level: LogLevel::Info,
            text: text.into(),
        }
    }

    fn warn(text: impl Into<String>) -> Self {
        Effect::Log {
            level: LogLevel::Warn,
            text: text.into(),
        }
    }

    fn debug(text: impl Into<String>) -> Self {
        Effect::Log {
            level: LogLevel::Debug,
            text: text.into(),
        }
    }
}

/// Verdict produced by the host for a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    pub score_delta: i32,
}

impl Verdict {
    /// Exact, case-sensitive comparison against the answer reference.
    pub fn judge(submitted: &str, reference: &str) -> Self {
        let correct = submitted == reference;
        Self {
            correct,
            score_delta: if correct { 1 } else { 0 },
        }
    }
}

/// The current round as seen by one peer.
pub struct RoundMachine {
    local_id: PlayerId,
    is_host: bool,
    bank: QuestionBank,
    think_ms: u64,
    round_index: u32,
    question: Option<String>,
    answer_ref: Option<String>,
    lock_holder: Option<PlayerId>,
    phase: RoundPhase,
}

impl RoundMachine {
    pub fn new(local_id: PlayerId, bank: QuestionBank, think_ms: u64) -> Self {
        Self {
            local_id,
            is_host: false,
            bank,
            think_ms,
            round_index: 0,
            question: None,
            answer_ref: None,
            lock_holder: None,
            phase: RoundPhase::NoRound,
        }
    }

    pub fn local_id(&self) -> &PlayerId {
        &self.local_id
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn set_host(&mut self, is_host: bool) {
        self.is_host = is_host;
    }

    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    pub fn lock_holder(&self) -> Option<&PlayerId> {
        self.lock_holder.as_ref()
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn think_ms(&self) -> u64 {
        self.think_ms
    }

    fn round_active(&self) -> bool {
        self.round_index > 0
    }

    /// Host-only: post the next question from the table.
    pub fn start_round(&mut self) -> Vec<Effect> {
        if !self.is_host {
            return vec![Effect::warn("not host, ignoring round start request")];
        }

        let next = self.round_index.saturating_add(1);
        let pick = self.bank.pick(next).clone();

        self.round_index = next;
        self.question = Some(pick.text.clone());
        self.answer_ref = Some(pick.answer.clone());
        self.lock_holder = None;
        self.phase = RoundPhase::QuestionPosted;

        vec![
            Effect::send(NetMessage::StartRound {
                round: next,
                question: pick.text.clone(),
                think_ms: self.think_ms,
                answer: pick.answer,
            }),
            Effect::info(format!("round {next} started: {}", pick.text)),
        ]
    }

    /// Local attempt to claim the lock. The lock itself is only granted by
    /// the host's arbitration.
    pub fn buzz(&mut self, now_ms: i64) -> Vec<Effect> {
        if !self.round_active() {
            return vec![Effect::debug("no round in progress, buzz ignored")];
        }
        if let Some(holder) = &self.lock_holder {
            return vec![Effect::debug(format!("already locked by {holder}, buzz ignored"))];
        }

        let mut effects = vec![
            Effect::send(NetMessage::Buzz {
                player_id: self.local_id.clone(),
                client_epoch_ms: now_ms,
            }),
            Effect::info("buzz sent"),
        ];
        if self.is_host {
            let local = self.local_id.clone();
            effects.extend(self.arbitrate(local));
        }
        effects
    }

    /// A buzz arrived from `from`. Only the host arbitrates; first buzz wins.
    pub fn on_buzz(&mut self, from: &PlayerId, claimed: &PlayerId, client_epoch_ms: i64) -> Vec<Effect> {
        if !self.is_host {
            return vec![Effect::debug(format!("buzz from {from} left to the host"))];
        }
        if !self.round_active() {
            return vec![Effect::debug(format!("buzz from {from} before any round, ignored"))];
        }

        let mut effects = Vec::new();
        if claimed != from {
            effects.push(Effect::warn(format!(
                "buzz from {from} claims to be {claimed}, using sender"
            )));
        }
        effects.push(Effect::debug(format!(
            "buzz from {from} stamped {client_epoch_ms}"
        )));
        effects.extend(self.arbitrate(from.clone()));
        effects
    }

    fn arbitrate(&mut self, candidate: PlayerId) -> Vec<Effect> {
        if let Some(holder) = &self.lock_holder {
            return vec![Effect::debug(format!(
                "round {} already locked by {holder}, buzz from {candidate} ignored",
                self.round_index
            ))];
        }

        self.lock_holder = Some(candidate.clone());
        self.phase = RoundPhase::Locked;
        vec![
            Effect::send(NetMessage::Lock {
                winner_id: candidate.clone(),
            }),
            Effect::info(format!("lock granted to {candidate}")),
        ]
    }

    /// Authoritative lock announcement; always overwrites the local view.
    pub fn on_lock(&mut self, winner: PlayerId) -> Vec<Effect> {
        if !self.round_active() {
            return vec![Effect::debug(format!("lock({winner}) before any round, ignored"))];
        }

        let text = if winner == self.local_id {
            "you hold the answer lock".to_string()
        } else {
            format!("{winner} holds the answer lock")
        };
        self.lock_holder = Some(winner);
        self.phase = RoundPhase::Locked;
        vec![Effect::info(text)]
    }

    /// Submit an answer while holding the lock. The host judges it at once.
    pub fn submit_answer(&mut self, text: String) -> Vec<Effect> {
        if self.lock_holder.as_ref() != Some(&self.local_id) {
            return vec![Effect::warn("answer rejected: not holding the lock")];
        }

        let mut effects = vec![
            Effect::send(NetMessage::Answer {
                player_id: self.local_id.clone(),
                text: text.clone(),
            }),
            Effect::info(format!("answer sent: {text}")),
        ];
        if self.is_host {
            effects.extend(self.judge_and_advance(&text));
        }
        effects
    }

    /// An answer arrived. The host judges it when it comes from the
    /// lock-holder; otherwise it is only logged.
    pub fn on_answer(&mut self, from: &PlayerId, text: &str) -> Vec<Effect> {
        if !self.round_active() {
            return vec![Effect::debug(format!("answer from {from} before any round, ignored"))];
        }

        let mut effects = vec![Effect::info(format!("{from} answered: {text}"))];
        if self.is_host {
            if self.lock_holder.as_ref() == Some(from) && self.phase == RoundPhase::Locked {
                effects.extend(self.judge_and_advance(text));
            } else {
                effects.push(Effect::warn(format!(
                    "answer from {from} without the lock, not judged"
                )));
            }
        }
        effects
    }

    fn judge_and_advance(&mut self, submitted: &str) -> Vec<Effect> {
        let reference = self.answer_ref.as_deref().unwrap_or_default();
        let verdict = Verdict::judge(submitted, reference);
        self.phase = RoundPhase::Judged;

        let mut effects = vec![
            Effect::send(NetMessage::Judge {
                correct: verdict.correct,
                score_delta: verdict.score_delta,
            }),
            Effect::info(format!(
                "judged {}: {:+}",
                if verdict.correct { "correct" } else { "wrong" },
                verdict.score_delta
            )),
        ];
        effects.extend(self.start_round());
        effects
    }

    pub fn on_judge(&self, correct: bool, score_delta: i32) -> Vec<Effect> {
        if !self.round_active() {
            return vec![Effect::debug("judge before any round, ignored")];
        }
        vec![Effect::info(format!(
            "verdict: {} {score_delta:+}",
            if correct { "correct" } else { "wrong" }
        ))]
    }

    /// Adopt the round announced by the host.
    pub fn on_start_round(
        &mut self,
        round: u32,
        question: String,
        think_ms: u64,
        answer: String,
    ) -> Vec<Effect> {
        let text = format!("round {round} received: {question}");
        self.round_index = round;
        self.question = Some(question);
        self.answer_ref = Some(answer);
        self.think_ms = think_ms;
        self.lock_holder = None;
        self.phase = RoundPhase::QuestionPosted;
        vec![Effect::info(text)]
    }

    pub fn on_hello(&self, from: &PlayerId, player_name: &str, is_host: bool) -> Vec<Effect> {
        vec![Effect::info(format!(
            "hello from {player_name} ({from}), host: {is_host}"
        ))]
    }

    /// Route a decoded message from `from` to its handler.
    pub fn on_message(&mut self, from: &PlayerId, message: NetMessage) -> Vec<Effect> {
        match message {
            NetMessage::Hello {
                player_name,
                is_host,
            } => self.on_hello(from, &player_name, is_host),
            NetMessage::StartRound {
                round,
                question,
                think_ms,
                answer,
            } => self.on_start_round(round, question, think_ms, answer),
            NetMessage::Buzz {
                player_id,
                client_epoch_ms,
            } => self.on_buzz(from, &player_id, client_epoch_ms),
            NetMessage::Lock { winner_id } => self.on_lock(winner_id),
            NetMessage::Answer { text, .. } => self.on_answer(from, &text),
            NetMessage::Judge {
                correct,
                score_delta,
            } => self.on_judge(correct, score_delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(effects: &[Effect]) -> Vec<&NetMessage> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send { message, .. } => Some(message),
                Effect::Log { .. } => None,
            })
            .collect()
    }

    fn host(id: &str) -> RoundMachine {
        let mut m = RoundMachine::new(PlayerId::from(id), QuestionBank::default(), 3000);
        m.set_host(true);
        m
    }

    fn client(id: &str) -> RoundMachine {
        RoundMachine::new(PlayerId::from(id), QuestionBank::default(), 3000)
    }

    #[test]
    fn test_non_host_cannot_start_round() {
        let mut m = client("bob");
        let effects = m.start_round();
        assert!(sent(&effects).is_empty());
        assert_eq!(m.round_index(), 0);
        assert_eq!(m.phase(), RoundPhase::NoRound);
    }

    #[test]
    fn test_round_index_is_monotonic() {
        let mut m = host("alice");
        let bank = QuestionBank::default();
        for expected in 1..=7u32 {
            let effects = m.start_round();
            assert_eq!(m.round_index(), expected);
            assert_eq!(m.question(), Some(bank.pick(expected).text.as_str()));
            match sent(&effects).as_slice() {
                [NetMessage::StartRound { round, .. }] => assert_eq!(*round, expected),
                other => panic!("unexpected sends: {other:?}"),
            }
        }
        // Rounds 1, 4 and 7 share a question with a three-entry table.
        assert_eq!(bank.pick(1), bank.pick(7));
    }

    #[test]
    fn test_first_buzz_wins_and_lock_is_frozen() {
        let mut m = host("alice");
        m.start_round();
        let bob = PlayerId::from("bob");
        let carol = PlayerId::from("carol");

        let effects = m.on_buzz(&bob, &bob, 10);
        assert_eq!(
            sent(&effects),
            vec![&NetMessage::Lock {
                winner_id: bob.clone()
            }]
        );
        assert_eq!(m.lock_holder(), Some(&bob));
        assert_eq!(m.phase(), RoundPhase::Locked);

        let effects = m.on_buzz(&carol, &carol, 5);
        assert!(sent(&effects).is_empty());
        assert_eq!(m.lock_holder(), Some(&bob));
    }

    #[test]
    fn test_client_ignores_buzz() {
        let mut m = client("bob");
        m.on_start_round(1, "Q".into(), 3000, "A".into());
        let alice = PlayerId::from("alice");
        let effects = m.on_buzz(&alice, &alice, 0);
        assert!(sent(&effects).is_empty());
        assert_eq!(m.lock_holder(), None);
    }

    #[test]
    fn test_local_buzz_does_not_lock_on_client() {
        let mut m = client("bob");
        m.on_start_round(1, "Q".into(), 3000, "A".into());
        let effects = m.buzz(99);
        assert!(matches!(
            effects.first(),
            Some(Effect::Send {
                mode: DeliveryMode::UnorderedBestEffort,
                ..
            })
        ));
        assert_eq!(m.lock_holder(), None);
    }

    #[test]
    fn test_host_buzz_arbitrates_itself() {
        let mut m = host("alice");
        m.start_round();
        let effects = m.buzz(1);
        let msgs = sent(&effects);
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[1], NetMessage::Lock { winner_id } if winner_id.as_str() == "alice"));
        assert_eq!(m.lock_holder().map(PlayerId::as_str), Some("alice"));
        assert!(sent(&m.buzz(2)).is_empty());
    }

    #[test]
    fn test_buzz_before_round_is_ignored() {
        let mut m = host("alice");
        assert!(sent(&m.buzz(0)).is_empty());
        let bob = PlayerId::from("bob");
        assert!(sent(&m.on_buzz(&bob, &bob, 0)).is_empty());
        assert_eq!(m.lock_holder(), None);
    }

    #[test]
    fn test_lock_overwrites_local_view() {
        let mut m = client("bob");
        m.on_start_round(1, "Q".into(), 3000, "A".into());
        m.on_lock(PlayerId::from("alice"));
        m.on_lock(PlayerId::from("bob"));
        assert_eq!(m.lock_holder().map(PlayerId::as_str), Some("bob"));
    }

    #[test]
    fn test_lock_before_round_is_ignored() {
        let mut m = client("bob");
        m.on_lock(PlayerId::from("alice"));
        assert_eq!(m.lock_holder(), None);
        assert_eq!(m.phase(), RoundPhase::NoRound);
    }

    #[test]
    fn test_submit_without_lock_is_noop() {
        let mut m = client("bob");
        m.on_start_round(1, "Q".into(), 3000, "A".into());
        assert!(sent(&m.submit_answer("A".into())).is_empty());
        m.on_lock(PlayerId::from("alice"));
        assert!(sent(&m.submit_answer("A".into())).is_empty());
    }

    #[test]
    fn test_client_submit_only_broadcasts_answer() {
        let mut m = client("bob");
        m.on_start_round(1, "Q".into(), 3000, "A".into());
        m.on_lock(PlayerId::from("bob"));
        let effects = m.submit_answer("A".into());
        assert_eq!(
            sent(&effects),
            vec![&NetMessage::Answer {
                player_id: PlayerId::from("bob"),
                text: "A".into()
            }]
        );
        assert_eq!(m.round_index(), 1);
    }

    #[test]
    fn test_verdict_is_exact_match() {
        assert_eq!(
            Verdict::judge("right", "right"),
            Verdict {
                correct: true,
                score_delta: 1
            }
        );
        assert_eq!(
            Verdict::judge("Right", "right"),
            Verdict {
                correct: false,
                score_delta: 0
            }
        );
        assert!(!Verdict::judge("right ", "right").correct);
    }

    #[test]
    fn test_host_answer_is_judged_then_next_round() {
        let mut m = host("alice");
        m.start_round();
        m.buzz(0);
        let answer = QuestionBank::default().pick(1).answer.clone();
        let effects = m.submit_answer(answer);
        let msgs = sent(&effects);
        assert!(matches!(msgs[0], NetMessage::Answer { .. }));
        assert_eq!(
            msgs[1],
            &NetMessage::Judge {
                correct: true,
                score_delta: 1
            }
        );
        assert!(matches!(msgs[2], NetMessage::StartRound { round: 2, .. }));
        assert_eq!(m.lock_holder(), None);
        assert_eq!(m.phase(), RoundPhase::QuestionPosted);
    }

    #[test]
    fn test_host_judges_remote_lock_holder_only() {
        let mut m = host("alice");
        m.start_round();
        let bob = PlayerId::from("bob");
        let carol = PlayerId::from("carol");

        let effects = m.on_answer(&carol, "anything");
        assert!(sent(&effects).is_empty());

        m.on_buzz(&bob, &bob, 0);
        let effects = m.on_answer(&bob, "wrong guess");
        let msgs = sent(&effects);
        assert_eq!(
            msgs[0],
            &NetMessage::Judge {
                correct: false,
                score_delta: 0
            }
        );
        assert_eq!(m.round_index(), 2);
    }

    #[test]
    fn test_client_only_logs_answer_and_judge() {
        let mut m = client("bob");
        m.on_start_round(3, "Q".into(), 3000, "A".into());
        let alice = PlayerId::from("alice");
        assert!(sent(&m.on_answer(&alice, "A")).is_empty());
        assert!(sent(&m.on_judge(true, 1)).is_empty());
        assert_eq!(m.round_index(), 3);
    }

    #[test]
    fn test_start_round_resets_lock() {
        let mut m = client("bob");
        m.on_start_round(1, "Q1".into(), 3000, "A1".into());
        m.on_lock(PlayerId::from("alice"));
        m.on_start_round(2, "Q2".into(), 1500, "A2".into());
        assert_eq!(m.lock_holder(), None);
        assert_eq!(m.question(), Some("Q2"));
        assert_eq!(m.think_ms(), 1500);
        assert_eq!(m.phase(), RoundPhase::QuestionPosted);
    }
}
