//! Transport layer for SIMID endpoints.
//!
//! Provides:
//! - `ChannelTransport` / `Inbox` - In-process channel standing in for
//!   cross-window messaging
//! - Receive pumps that drive `Endpoint::receive_message`
//! - `connect` - Wire a host and a guest together

pub mod channel;
pub mod pump;

pub use channel::{ChannelTransport, Inbox, channel};
pub use pump::{Link, connect, spawn_receiver, spawn_stream_receiver};
