//! Two full sessions talking over the in-memory loopback link.

use std::sync::Arc;
use std::time::Duration;

use buzz_quiz::session::{
    mailbox, MatchStatus, RoundPhase, SessionController, SessionHandle, SessionSnapshot,
};
use buzz_quiz::transport::{pair, LoopbackEndpoint};
use buzz_quiz::{PlayerId, QuestionBank, SessionConfig};
use tokio::task::JoinHandle;

struct Match {
    alice: SessionHandle,
    bob: SessionHandle,
    link: LoopbackEndpoint,
    tasks: Vec<JoinHandle<()>>,
}

impl Match {
    fn start() -> Self {
        let alice_cfg = SessionConfig::new(PlayerId::from("alice"), "Alice");
        let bob_cfg = SessionConfig::new(PlayerId::from("bob"), "Bob");

        let (alice, alice_box) = mailbox(alice_cfg.player_id.clone());
        let (bob, bob_box) = mailbox(bob_cfg.player_id.clone());
        let (a, b) = pair(
            (alice_cfg.player_id.clone(), alice.events()),
            (bob_cfg.player_id.clone(), bob.events()),
        );

        let tasks = vec![
            tokio::spawn(
                SessionController::new(alice_cfg, alice_box, Arc::new(a.clone()), Arc::new(a.clone()))
                    .run(),
            ),
            tokio::spawn(
                SessionController::new(bob_cfg, bob_box, Arc::new(b.clone()), Arc::new(b)).run(),
            ),
        ];

        Self {
            alice,
            bob,
            link: a,
            tasks,
        }
    }

    async fn stop(self) {
        self.alice.shutdown();
        self.bob.shutdown();
        for task in self.tasks {
            task.await.unwrap();
        }
    }
}

async fn wait_for<F>(handle: &SessionHandle, what: &str, predicate: F) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    let mut updates = handle.subscribe();
    let snap = tokio::time::timeout(Duration::from_secs(5), updates.wait_for(predicate))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .expect("session stopped")
        .clone();
    snap
}

async fn matched() -> Match {
    let game = Match::start();
    game.alice.request_matchmaking();
    game.bob.request_matchmaking();
    wait_for(&game.alice, "round 1 on alice", |s| s.round_index == 1).await;
    wait_for(&game.bob, "round 1 on bob", |s| s.round_index == 1).await;
    game
}

#[tokio::test]
async fn test_both_peers_agree_on_host() {
    let game = matched().await;

    let alice = game.alice.snapshot();
    let bob = game.bob.snapshot();
    assert!(alice.is_host);
    assert!(!bob.is_host);
    assert_eq!(alice.match_status, MatchStatus::Matched);
    assert_eq!(bob.match_status, MatchStatus::Matched);
    assert_eq!(alice.question, bob.question);
    assert_eq!(
        bob.question.as_deref(),
        Some(QuestionBank::default().pick(1).text.as_str())
    );

    game.stop().await;
}

#[tokio::test]
async fn test_example_round_converges() {
    let game = matched().await;
    let bank = QuestionBank::default();

    game.bob.buzz();
    let bob = wait_for(&game.bob, "lock on bob", |s| s.lock_holder.is_some()).await;
    assert_eq!(bob.lock_holder, Some(PlayerId::from("bob")));
    assert_eq!(bob.phase, RoundPhase::Locked);
    let alice = wait_for(&game.alice, "lock on alice", |s| s.lock_holder.is_some()).await;
    assert_eq!(alice.lock_holder, Some(PlayerId::from("bob")));

    game.bob.submit_answer(bank.pick(1).answer.clone());
    let bob = wait_for(&game.bob, "round 2 on bob", |s| s.round_index == 2).await;
    assert_eq!(bob.lock_holder, None);
    assert_eq!(bob.question.as_deref(), Some(bank.pick(2).text.as_str()));
    assert!(bob.log.iter().any(|l| l.contains("correct +1")));

    let alice = wait_for(&game.alice, "round 2 on alice", |s| s.round_index == 2).await;
    assert_eq!(alice.lock_holder, None);

    game.stop().await;
}

#[tokio::test]
async fn test_racing_buzzes_converge_on_one_winner() {
    let game = matched().await;

    game.bob.buzz();
    game.alice.buzz();

    let alice = wait_for(&game.alice, "alice lock", |s| s.lock_holder.is_some()).await;
    let winner = alice.lock_holder.clone();
    // The client only learns the lock from the host.
    let bob = wait_for(&game.bob, "bob lock", |s| s.lock_holder.is_some()).await;
    assert_eq!(bob.lock_holder, winner);

    game.stop().await;
}

#[tokio::test]
async fn test_dropped_buzz_simply_loses() {
    let game = matched().await;
    game.link.set_drop_best_effort(true);

    game.bob.buzz();
    game.alice.buzz();

    let bob = wait_for(&game.bob, "alice wins", |s| s.lock_holder.is_some()).await;
    assert_eq!(bob.lock_holder, Some(PlayerId::from("alice")));

    game.stop().await;
}

#[tokio::test]
async fn test_disconnect_ends_both_sessions() {
    let game = matched().await;
    game.link.disconnect();

    let alice = wait_for(&game.alice, "alice ended", |s| s.ended).await;
    let bob = wait_for(&game.bob, "bob ended", |s| s.ended).await;
    assert!(!alice.is_connected());
    assert!(!bob.is_connected());

    game.stop().await;
}
