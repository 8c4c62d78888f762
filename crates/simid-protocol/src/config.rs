//! Endpoint configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::messages::{self, player, split_type};

/// Which side of the handshake an endpoint plays.
///
/// The host is authoritative: it mints the session id before its first
/// message. The guest adopts the id carried by the first valid envelope it
/// receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Host,
    Guest,
}

/// Endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EndpointConfig {
    /// Handshake side.
    pub role: Role,

    /// Type exempt from the session check.
    #[serde(default = "default_handshake_type")]
    pub handshake_type: String,

    /// Types that expect a resolve/reject.
    #[serde(default = "messages::default_response_required")]
    pub response_required: HashSet<String>,

    /// Pending-request capacity. Unlimited when absent.
    #[serde(default)]
    pub max_pending: Option<usize>,

    /// Fixed session id for a host. A fresh UUID is minted when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_handshake_type() -> String {
    player::INIT.to_string()
}

impl EndpointConfig {
    /// Default host configuration.
    #[must_use]
    pub fn host() -> Self {
        Self::new(Role::Host)
    }

    /// Default guest configuration.
    #[must_use]
    pub fn guest() -> Self {
        Self::new(Role::Guest)
    }

    fn new(role: Role) -> Self {
        Self {
            role,
            handshake_type: default_handshake_type(),
            response_required: messages::default_response_required(),
            max_pending: None,
            session_id: None,
        }
    }

    /// Replace the response-required set.
    #[must_use]
    pub fn with_response_required<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response_required = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the handshake type.
    #[must_use]
    pub fn with_handshake_type(mut self, handshake_type: impl Into<String>) -> Self {
        self.handshake_type = handshake_type.into();
        self
    }

    /// Limit the number of outstanding requests.
    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = Some(max_pending);
        self
    }

    /// Use a fixed session id (host only).
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Whether `message_type` expects a resolve/reject.
    #[must_use]
    pub fn requires_response(&self, message_type: &str) -> bool {
        self.response_required.contains(message_type)
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or fails validation.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field consistency.
    ///
    /// # Errors
    /// Returns error describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if split_type(&self.handshake_type).is_none() {
            return Err(ConfigError::Invalid(format!(
                "handshakeType {:?} is not of the form Role:verb",
                self.handshake_type
            )));
        }
        if let Some(bad) = self.response_required.iter().find(|t| split_type(t).is_none()) {
            return Err(ConfigError::Invalid(format!(
                "responseRequired entry {bad:?} is not of the form Role:verb"
            )));
        }
        if self.max_pending == Some(0) {
            return Err(ConfigError::Invalid("maxPending must be greater than 0".into()));
        }
        match (&self.session_id, self.role) {
            (Some(id), Role::Host) if id.is_empty() => {
                Err(ConfigError::Invalid("sessionId must not be empty".into()))
            }
            (Some(_), Role::Guest) => Err(ConfigError::Invalid(
                "sessionId is host-only; a guest adopts it".into(),
            )),
            _ => Ok(()),
        }
    }
}
