//! # buzz-quiz
//!
//! A two-player buzzer quiz played over a peer-to-peer session link.
//!
//! One peer is elected host from the connected player ids and drives the
//! rounds: it posts questions, arbitrates the first buzz into an answer lock
//! and judges answers. The other peer mirrors the host through the messages
//! in [`protocol`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use buzz_quiz::session::{mailbox, SessionController};
//! use buzz_quiz::transport::pair;
//! use buzz_quiz::{PlayerId, SessionConfig};
//!
//! # async fn demo() {
//! let alice = SessionConfig::new(PlayerId::from("alice"), "Alice");
//! let bob = SessionConfig::new(PlayerId::from("bob"), "Bob");
//!
//! let (alice_handle, alice_box) = mailbox(alice.player_id.clone());
//! let (bob_handle, bob_box) = mailbox(bob.player_id.clone());
//! let (a, b) = pair(
//!     (alice.player_id.clone(), alice_handle.events()),
//!     (bob.player_id.clone(), bob_handle.events()),
//! );
//!
//! tokio::spawn(SessionController::new(alice, alice_box, Arc::new(a.clone()), Arc::new(a)).run());
//! tokio::spawn(SessionController::new(bob, bob_box, Arc::new(b.clone()), Arc::new(b)).run());
//!
//! alice_handle.request_matchmaking();
//! bob_handle.request_matchmaking();
//! # }
//! ```

pub mod app;
pub mod config;
mod data;
mod models;
pub mod protocol;
pub mod session;
pub mod terminal;
pub mod transport;
mod ui;

use std::io;

use thiserror::Error;

pub use config::SessionConfig;
pub use data::{load_questions_from_json, LoadError};
pub use models::{PlayerId, Question, QuestionBank};

/// Error type for quiz operations.
#[derive(Debug, Error)]
pub enum QuizError {
    /// Error loading questions from file.
    #[error("Failed to load questions: {0}")]
    Load(#[from] LoadError),
    /// IO error while running the terminal front end.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Invalid command-line combination.
    #[error("{0}")]
    Usage(String),
}
