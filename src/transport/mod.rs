//! Session bus implementations.

pub mod loopback;
mod ws;

pub use loopback::{pair, LoopbackEndpoint};
pub use ws::{WsEndpoint, WsTransport};
