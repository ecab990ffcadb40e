mod messages;

pub use messages::{decode, encode, DeliveryMode, NetMessage, DEFAULT_PORT, DEFAULT_THINK_MS};
