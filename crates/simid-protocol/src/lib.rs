//! Message protocol between an ad player (host) and a sandboxed creative (guest).
//!
//! Provides:
//! - `Envelope` - Wire format and defensive decoding
//! - `Session` - Host-authoritative session negotiation
//! - `PendingRequests` / `ResponseFuture` - Request/response correlation
//! - `ListenerRegistry` - Per-type handler dispatch
//! - `Endpoint` - The object each side owns
//! - `Transport` - Seam to whatever carries the text

pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod messages;
pub mod pending;
pub mod session;
pub mod transport;

pub use config::{EndpointConfig, Role};
pub use dispatch::{ListenerRegistry, MessageHandler};
pub use endpoint::{Endpoint, EndpointStats, WeakEndpoint};
pub use envelope::{Control, Envelope};
pub use error::{ConfigError, RequestError, TransportError};
pub use messages::ErrorPayload;
pub use pending::{Outcome, PendingRequests, ResponseFuture};
pub use session::{Admission, Session};
pub use transport::Transport;
