//! Host-authoritative session negotiation.

use uuid::Uuid;

use crate::config::Role;
use crate::envelope::Envelope;

/// Result of checking an inbound envelope against the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Session matches, or the type is handshake-exempt.
    Accepted,
    /// The guest took this id from the envelope, either on first contact or
    /// from a handshake under a new session.
    Adopted(String),
    /// Dropped: the envelope belongs to another session.
    Mismatch { expected: String, got: String },
    /// Dropped: a guest cannot adopt an empty id.
    Unadoptable,
}

/// Session state owned by one endpoint.
#[derive(Debug, Clone)]
pub struct Session {
    role: Role,
    id: Option<String>,
}

impl Session {
    /// Host session with a freshly minted id.
    #[must_use]
    pub fn host() -> Self {
        Self::host_with_id(generate_session_id())
    }

    /// Host session with a fixed id.
    #[must_use]
    pub fn host_with_id(id: impl Into<String>) -> Self {
        Self {
            role: Role::Host,
            id: Some(id.into()),
        }
    }

    /// Guest session awaiting adoption.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            role: Role::Guest,
            id: None,
        }
    }

    /// Agreed id, `None` until a guest adopts one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Check `envelope` against the session, adopting its id if this is a
    /// guest that has none yet.
    ///
    /// Once set, the id only changes when a guest receives the handshake type
    /// under another non-empty id; the host has re-initialised and replies must
    /// carry its new session.
    pub fn admit(&mut self, envelope: &Envelope, handshake_type: &str) -> Admission {
        let Some(expected) = self.id.as_deref() else {
            if envelope.session_id.is_empty() {
                return Admission::Unadoptable;
            }
            self.id = Some(envelope.session_id.clone());
            return Admission::Adopted(envelope.session_id.clone());
        };

        if envelope.session_id == expected {
            Admission::Accepted
        } else if envelope.message_type == handshake_type {
            match self.role {
                Role::Guest if !envelope.session_id.is_empty() => {
                    self.id = Some(envelope.session_id.clone());
                    Admission::Adopted(envelope.session_id.clone())
                }
                _ => Admission::Accepted,
            }
        } else {
            Admission::Mismatch {
                expected: expected.to_string(),
                got: envelope.session_id.clone(),
            }
        }
    }

    /// Start over: a host mints a new id, a guest forgets its adopted one.
    pub fn renew(&mut self) {
        self.id = match self.role {
            Role::Host => Some(generate_session_id()),
            Role::Guest => None,
        };
    }
}

/// Mint a new session id.
#[must_use]
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}
