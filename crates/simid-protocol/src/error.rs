//! Error types for the protocol layer.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Outcome error of a response future.
///
/// `Rejected` is the only variant produced by the peer; every other variant
/// is raised locally by the endpoint that owns the pending request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("Rejected by peer: {0}")]
    Rejected(Value),
    #[error("Endpoint closed")]
    Closed,
    #[error("Request cancelled")]
    Cancelled,
    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Too many pending requests (limit {0})")]
    TooManyPending(usize),
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Transport error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No message target set")]
    NoTarget,
    #[error("Peer disconnected")]
    Disconnected,
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
