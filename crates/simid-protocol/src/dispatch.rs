//! Listener registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::envelope::Envelope;

/// Handler for one application message type.
///
/// Handlers run synchronously on the receiving endpoint. A handler for a
/// response-requiring type should eventually call
/// [`Endpoint::resolve`] or [`Endpoint::reject`]; to answer later, clone the
/// envelope and the endpoint and move them into a task.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, endpoint: &Endpoint, envelope: &Envelope);
}

impl<F> MessageHandler for F
where
    F: Fn(&Endpoint, &Envelope) + Send + Sync,
{
    fn handle(&self, endpoint: &Endpoint, envelope: &Envelope) {
        self(endpoint, envelope);
    }
}

/// Handlers per message type, in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Vec<Arc<dyn MessageHandler>>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `message_type`.
    pub fn add(&mut self, message_type: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        self.listeners
            .entry(message_type.into())
            .or_default()
            .push(handler);
    }

    /// Snapshot of the handlers for `message_type`.
    ///
    /// Returned by value so the caller can invoke them without holding the
    /// endpoint lock; handlers may re-enter the endpoint.
    #[must_use]
    pub fn handlers_for(&self, message_type: &str) -> Vec<Arc<dyn MessageHandler>> {
        self.listeners
            .get(message_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of handlers registered for `message_type`.
    #[must_use]
    pub fn count(&self, message_type: &str) -> usize {
        self.listeners.get(message_type).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::Value;

    use super::*;

    struct Tagged {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl MessageHandler for Tagged {
        fn handle(&self, _endpoint: &Endpoint, _envelope: &Envelope) {
            self.log.lock().unwrap().push(self.tag);
        }
    }

    #[test]
    fn test_handlers_keep_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        for tag in ["a", "b", "c"] {
            registry.add("Media:play", Arc::new(Tagged { tag, log: log.clone() }));
        }
        registry.add("Media:pause", Arc::new(Tagged { tag: "x", log: log.clone() }));

        let endpoint = Endpoint::guest();
        let envelope = Envelope::new("Media:play", Value::Null, "S1", 1);
        for handler in registry.handlers_for("Media:play") {
            handler.handle(&endpoint, &envelope);
        }
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(registry.count("Media:pause"), 1);
    }

    #[test]
    fn test_unknown_type_has_no_handlers() {
        let registry = ListenerRegistry::new();
        assert!(registry.handlers_for("Media:play").is_empty());
        assert_eq!(registry.count("Media:play"), 0);
    }

    #[test]
    fn test_clear() {
        let mut registry = ListenerRegistry::new();
        registry.add("Media:play", Arc::new(|_: &Endpoint, _: &Envelope| {}));
        assert_eq!(registry.count("Media:play"), 1);
        registry.clear();
        assert_eq!(registry.count("Media:play"), 0);
    }
}
