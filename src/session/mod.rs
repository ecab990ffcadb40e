//! Two-player buzzer session.
//!
//! - `election` - deterministic host choice from the connected set
//! - `round` - round state machine, returns effects instead of doing I/O
//! - `controller` - the actor that owns the session and applies effects
//! - `bus` - boundary with the transport
//! - `matchmaking` - search requests and their timeout

mod bus;
mod controller;
mod election;
mod matchmaking;
mod round;

pub use bus::{BusError, BusEvent, BusEvents, SessionBus};
pub use controller::{mailbox, Mailbox, SessionCommand, SessionController, SessionHandle, SessionSnapshot};
pub use election::{elect, elected_host};
pub use matchmaking::{MatchStatus, Matchmaker, DEFAULT_MATCHMAKING_TIMEOUT};
pub use round::{Effect, LogLevel, RoundMachine, RoundPhase, Verdict};
