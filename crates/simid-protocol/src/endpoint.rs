//! One side of the protocol.
//!
//! An [`Endpoint`] composes the session, the pending-request table and the
//! listener registry behind a cheap-to-clone handle. Collaborators receive
//! the handle explicitly; there is no process-wide instance.
//!
//! Inbound flow: text → [`decode`] → session check → either settle a pending
//! request (`resolve`/`reject`) or run the listeners registered for the
//! type. Handlers run after the endpoint lock is released, so they may call
//! back into the endpoint.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use serde_json::Value;

use crate::config::{EndpointConfig, Role};
use crate::dispatch::{ListenerRegistry, MessageHandler};
use crate::envelope::{self, Control, Envelope, decode};
use crate::error::{RequestError, TransportError};
use crate::pending::{Outcome, PendingRequests, ResponseFuture};
use crate::session::{Admission, Session};
use crate::transport::Transport;

/// Traffic counters for one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Envelopes handed to the transport.
    pub sent: u64,
    /// Inbound texts seen, valid or not.
    pub received: u64,
    /// Application envelopes handed to at least one listener.
    pub dispatched: u64,
    /// Informational messages the transport could not carry.
    pub undelivered: u64,
    pub dropped_malformed: u64,
    pub dropped_session_mismatch: u64,
    /// Control envelopes with no matching pending request.
    pub stale_responses: u64,
}

struct State {
    next_message_id: u64,
    session: Session,
    pending: PendingRequests,
    listeners: ListenerRegistry,
    stats: EndpointStats,
    closed: bool,
}

struct Inner {
    config: EndpointConfig,
    state: Mutex<State>,
    target: RwLock<Option<Arc<dyn Transport>>>,
}

/// Protocol endpoint (host or guest).
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<Inner>,
}

/// Non-owning handle to an [`Endpoint`].
///
/// Receive pumps hold one of these so that dropping every `Endpoint` handle
/// tears the endpoint down.
#[derive(Debug, Clone)]
pub struct WeakEndpoint {
    inner: Weak<Inner>,
}

impl WeakEndpoint {
    /// The endpoint, if any strong handle is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Endpoint> {
        self.inner.upgrade().map(|inner| Endpoint { inner })
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("role", &self.inner.config.role)
            .field("session_id", &self.session_id())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// Create an endpoint. A host mints its session id here, before any
    /// message is sent.
    #[must_use]
    pub fn new(config: EndpointConfig) -> Self {
        let session = match (config.role, config.session_id.as_deref()) {
            (Role::Host, Some(id)) => Session::host_with_id(id),
            (Role::Host, None) => Session::host(),
            (Role::Guest, _) => Session::guest(),
        };
        let pending = PendingRequests::new(config.max_pending);
        tracing::debug!(role = ?config.role, session_id = ?session.id(), "Created endpoint");

        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    next_message_id: 1,
                    session,
                    pending,
                    listeners: ListenerRegistry::new(),
                    stats: EndpointStats::default(),
                    closed: false,
                }),
                target: RwLock::new(None),
            }),
        }
    }

    /// Host endpoint with default configuration.
    #[must_use]
    pub fn host() -> Self {
        Self::new(EndpointConfig::host())
    }

    /// Guest endpoint with default configuration.
    #[must_use]
    pub fn guest() -> Self {
        Self::new(EndpointConfig::guest())
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakEndpoint {
        WeakEndpoint {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.inner.config.role
    }

    /// Agreed session id, `None` for a guest that has not adopted one yet.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.state().session.id().map(str::to_string)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    #[must_use]
    pub fn stats(&self) -> EndpointStats {
        self.state().stats
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Point outbound traffic at `target`, replacing any previous one.
    pub fn set_message_target(&self, target: Arc<dyn Transport>) {
        *self
            .inner
            .target
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(target);
    }

    /// Register a closure for `message_type`.
    pub fn add_listener<F>(&self, message_type: impl Into<String>, handler: F)
    where
        F: Fn(&Self, &Envelope) + Send + Sync + 'static,
    {
        self.add_handler(message_type, Arc::new(handler));
    }

    /// Register a handler object for `message_type`.
    pub fn add_handler(&self, message_type: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        let message_type = message_type.into();
        let mut state = self.state();
        if state.closed {
            tracing::debug!(%message_type, "Ignoring listener registration on closed endpoint");
            return;
        }
        state.listeners.add(message_type.clone(), handler);
        tracing::trace!(
            %message_type,
            listeners = state.listeners.count(&message_type),
            "Added listener"
        );
    }

    /// Send an application message.
    ///
    /// Types outside the response-required set resolve immediately with
    /// `null`, even if the transport loses them. Others resolve or reject
    /// with the peer's answer, and stay pending if the peer never answers.
    pub fn send_message(&self, message_type: &str, args: Value) -> ResponseFuture {
        let (message_id, session_id, rx) = {
            let mut state = self.state();
            let message_id = state.next_message_id;
            state.next_message_id += 1;

            if state.closed {
                return ResponseFuture::ready(message_id, Err(RequestError::Closed));
            }

            let rx = if self.inner.config.requires_response(message_type) {
                match state.pending.register(message_id, message_type) {
                    Ok(rx) => Some(rx),
                    Err(e) => {
                        tracing::warn!(message_id, message_type, "Request not sent: {e}");
                        return ResponseFuture::ready(message_id, Err(e));
                    }
                }
            } else {
                None
            };
            let session_id = state.session.id().unwrap_or_default().to_string();
            (message_id, session_id, rx)
        };

        let posted = envelope::encode(message_type, &args, &session_id, message_id)
            .map_err(|e| RequestError::Transport(e.to_string()))
            .and_then(|text| self.post(text).map_err(|e| RequestError::Transport(e.to_string())));

        tracing::trace!(message_id, message_type, ok = posted.is_ok(), "Sent message");

        match (rx, posted) {
            (Some(rx), Ok(())) => ResponseFuture::waiting(message_id, rx),
            (Some(rx), Err(e)) => {
                // Settle through the table so the entry does not linger.
                self.state().pending.settle(message_id, Err(e));
                ResponseFuture::waiting(message_id, rx)
            }
            (None, Ok(())) => ResponseFuture::ready(message_id, Ok(Value::Null)),
            (None, Err(e)) => {
                self.state().stats.undelivered += 1;
                tracing::warn!(message_id, message_type, "Message lost: {e}");
                ResponseFuture::ready(message_id, Ok(Value::Null))
            }
        }
    }

    /// Send and wait at most `timeout` for the answer. On expiry the pending
    /// entry is cancelled and `TimedOut` is returned.
    ///
    /// # Errors
    /// Returns the peer's rejection, `TimedOut`, or any local failure.
    pub async fn send_message_with_timeout(
        &self,
        message_type: &str,
        args: Value,
        timeout: Duration,
    ) -> Outcome {
        let response = self.send_message(message_type, args);
        let message_id = response.message_id();
        match tokio::time::timeout(timeout, response).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.state().pending.settle(message_id, Err(RequestError::TimedOut(timeout)));
                tracing::debug!(message_id, message_type, ?timeout, "Request timed out");
                Err(RequestError::TimedOut(timeout))
            }
        }
    }

    /// Reject a pending request with `Cancelled`. Returns `false` if it was
    /// already settled or never existed.
    pub fn cancel(&self, message_id: u64) -> bool {
        let mut state = self.state();
        let Some(age) = state.pending.age(message_id) else {
            return false;
        };
        tracing::debug!(message_id, ?age, "Cancelling request");
        state
            .pending
            .settle(message_id, Err(RequestError::Cancelled))
    }

    /// Answer `incoming` successfully with `payload`.
    pub fn resolve(&self, incoming: &Envelope, payload: Value) {
        self.reply(incoming, Control::Resolve, payload);
    }

    /// Answer `incoming` with an error `payload`.
    pub fn reject(&self, incoming: &Envelope, payload: Value) {
        self.reply(incoming, Control::Reject, payload);
    }

    fn reply(&self, incoming: &Envelope, control: Control, payload: Value) {
        let session_id = {
            let state = self.state();
            if state.closed {
                tracing::debug!(message_id = incoming.message_id, "Dropping reply on closed endpoint");
                return;
            }
            state.session.id().unwrap_or_default().to_string()
        };

        let reply = Envelope::reply_to(incoming, control, payload, &session_id);
        let result = reply
            .to_text()
            .map_err(|e| e.to_string())
            .and_then(|text| self.post(text).map_err(|e| e.to_string()));
        if let Err(e) = result {
            tracing::warn!(message_id = incoming.message_id, ?control, "Failed to send reply: {e}");
        }
    }

    fn post(&self, text: String) -> Result<(), TransportError> {
        let target = self
            .inner
            .target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::NoTarget)?;
        target.post(text)?;
        self.state().stats.sent += 1;
        Ok(())
    }

    /// Handle one inbound text from the transport. Never fails: malformed,
    /// foreign and stale traffic is dropped and counted.
    pub fn receive_message(&self, text: &str) {
        let mut state = self.state();
        if state.closed {
            return;
        }
        state.stats.received += 1;

        let Some(envelope) = decode(text) else {
            state.stats.dropped_malformed += 1;
            tracing::debug!(len = text.len(), "Dropping malformed message");
            return;
        };

        match state.session.admit(&envelope, &self.inner.config.handshake_type) {
            Admission::Accepted => {}
            Admission::Adopted(session_id) => {
                tracing::debug!(%session_id, "Adopted session");
            }
            Admission::Mismatch { expected, got } => {
                state.stats.dropped_session_mismatch += 1;
                tracing::debug!(
                    %expected,
                    %got,
                    message_type = %envelope.message_type,
                    "Dropping message from another session"
                );
                return;
            }
            Admission::Unadoptable => {
                state.stats.dropped_session_mismatch += 1;
                tracing::debug!(
                    message_type = %envelope.message_type,
                    "Dropping message without session id"
                );
                return;
            }
        }

        if let Some(control) = envelope.control() {
            let outcome = match control {
                Control::Resolve => Ok(envelope.args),
                Control::Reject => Err(RequestError::Rejected(envelope.args)),
            };
            if !state.pending.settle(envelope.message_id, outcome) {
                state.stats.stale_responses += 1;
                tracing::debug!(
                    message_id = envelope.message_id,
                    ?control,
                    "Ignoring response with no pending request"
                );
            }
            return;
        }

        let handlers = state.listeners.handlers_for(&envelope.message_type);
        if !handlers.is_empty() {
            state.stats.dispatched += 1;
        }
        drop(state);

        tracing::trace!(
            message_id = envelope.message_id,
            message_type = %envelope.message_type,
            handlers = handlers.len(),
            "Dispatching message"
        );
        for handler in handlers {
            handler.handle(self, &envelope);
        }
    }

    /// Start a new session over the same endpoint, e.g. after the peer frame
    /// was recreated. Pending requests are rejected with `Closed`; listeners
    /// and the message-id counter are kept.
    pub fn reset(&self) {
        let mut state = self.state();
        let rejected = state.pending.drain(&RequestError::Closed);
        state.session.renew();
        tracing::debug!(rejected, session_id = ?state.session.id(), "Reset endpoint");
    }

    /// Tear down: reject pending requests with `Closed`, drop listeners and
    /// the message target. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.state();
            if state.closed {
                return;
            }
            state.closed = true;
            let rejected = state.pending.drain(&RequestError::Closed);
            state.listeners.clear();
            tracing::debug!(rejected, "Closed endpoint");
        }
        *self
            .inner
            .target
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
