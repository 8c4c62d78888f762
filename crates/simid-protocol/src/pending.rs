//! Request/response correlation.
//!
//! Each response-requiring message registers a oneshot sender keyed by its
//! message id. A matching `resolve`/`reject` removes the entry and fires the
//! sender, so an entry settles at most once. Entries that never see a reply
//! stay until cancelled, drained, or the table is dropped.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::FusedFuture;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::RequestError;

/// Settled value of a request.
pub type Outcome = Result<Value, RequestError>;

struct PendingRequest {
    message_type: String,
    sent_at: Instant,
    reply: oneshot::Sender<Outcome>,
}

/// Outstanding requests keyed by message id.
#[derive(Default)]
pub struct PendingRequests {
    entries: HashMap<u64, PendingRequest>,
    limit: Option<usize>,
}

impl PendingRequests {
    /// Create a table with an optional capacity limit.
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            limit,
        }
    }

    /// Register `message_id` and return the receiving half.
    ///
    /// # Errors
    /// Returns `TooManyPending` if the table is full.
    pub fn register(
        &mut self,
        message_id: u64,
        message_type: &str,
    ) -> Result<oneshot::Receiver<Outcome>, RequestError> {
        if let Some(limit) = self.limit {
            if self.entries.len() >= limit {
                return Err(RequestError::TooManyPending(limit));
            }
        }
        let (reply, rx) = oneshot::channel();
        self.entries.insert(
            message_id,
            PendingRequest {
                message_type: message_type.to_string(),
                sent_at: Instant::now(),
                reply,
            },
        );
        Ok(rx)
    }

    /// Settle `message_id`. Returns `false` if there was no such entry.
    pub fn settle(&mut self, message_id: u64, outcome: Outcome) -> bool {
        let Some(pending) = self.entries.remove(&message_id) else {
            return false;
        };
        tracing::trace!(
            message_id,
            message_type = %pending.message_type,
            elapsed = ?pending.sent_at.elapsed(),
            ok = outcome.is_ok(),
            "Settled request"
        );
        // The caller may have dropped its future; that is not an error.
        let _ = pending.reply.send(outcome);
        true
    }

    /// Reject every entry with `error`. Returns how many were settled.
    pub fn drain(&mut self, error: &RequestError) -> usize {
        let count = self.entries.len();
        for (_, pending) in self.entries.drain() {
            let _ = pending.reply.send(Err(error.clone()));
        }
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Time since `message_id` was sent.
    #[must_use]
    pub fn age(&self, message_id: u64) -> Option<Duration> {
        self.entries.get(&message_id).map(|p| p.sent_at.elapsed())
    }
}

enum State {
    Ready(Option<Outcome>),
    Waiting(oneshot::Receiver<Outcome>),
    Done,
}

/// Future returned by [`Endpoint::send_message`](crate::Endpoint::send_message).
///
/// Informational messages return an already-fulfilled future with `null`;
/// response-requiring ones settle when the peer answers, the request is
/// cancelled, or the endpoint is closed.
#[must_use = "a response future does nothing unless awaited"]
pub struct ResponseFuture {
    message_id: u64,
    state: State,
}

impl ResponseFuture {
    /// Future that waits on the pending table.
    pub(crate) fn waiting(message_id: u64, rx: oneshot::Receiver<Outcome>) -> Self {
        Self {
            message_id,
            state: State::Waiting(rx),
        }
    }

    /// Future that is settled from the start.
    pub(crate) fn ready(message_id: u64, outcome: Outcome) -> Self {
        Self {
            message_id,
            state: State::Ready(Some(outcome)),
        }
    }

    /// Id the request was sent with.
    #[must_use]
    pub const fn message_id(&self) -> u64 {
        self.message_id
    }

    /// Whether this future waits for a reply from the peer.
    #[must_use]
    pub const fn awaits_reply(&self) -> bool {
        matches!(self.state, State::Waiting(_))
    }
}

impl Future for ResponseFuture {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match &mut self.state {
            State::Ready(outcome) => outcome.take().unwrap_or(Err(RequestError::Closed)),
            State::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(outcome)) => outcome,
                // Sender dropped without settling: the table went away.
                Poll::Ready(Err(_)) => Err(RequestError::Closed),
                Poll::Pending => return Poll::Pending,
            },
            State::Done => return Poll::Pending,
        };
        self.state = State::Done;
        Poll::Ready(outcome)
    }
}

impl FusedFuture for ResponseFuture {
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[test]
    fn test_settle_fulfils_once() {
        let mut table = PendingRequests::default();
        let rx = table.register(1, "Player:init").unwrap();
        let mut fut = task::spawn(ResponseFuture::waiting(1, rx));
        assert_pending!(fut.poll());

        assert!(table.settle(1, Ok(json!({"ok": true}))));
        assert!(fut.is_woken());
        assert_eq!(assert_ready!(fut.poll()), Ok(json!({"ok": true})));

        assert!(!table.settle(1, Ok(json!("again"))));
        assert!(table.is_empty());
    }

    #[test]
    fn test_settle_reject() {
        let mut table = PendingRequests::default();
        let rx = table.register(4, "Creative:requestSkip").unwrap();
        table.settle(4, Err(RequestError::Rejected(json!({"errorCode": 1}))));
        let outcome = tokio_test::block_on(ResponseFuture::waiting(4, rx));
        assert_eq!(outcome, Err(RequestError::Rejected(json!({"errorCode": 1}))));
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let mut table = PendingRequests::default();
        let _rx = table.register(1, "Player:init").unwrap();
        assert!(!table.settle(2, Ok(Value::Null)));
        assert_eq!(table.len(), 1);
        assert!(table.age(1).is_some());
    }

    #[test]
    fn test_out_of_order_settlement() {
        let mut table = PendingRequests::default();
        let rx1 = table.register(1, "Player:init").unwrap();
        let rx2 = table.register(2, "Player:startCreative").unwrap();
        table.settle(2, Ok(json!(2)));
        table.settle(1, Ok(json!(1)));
        assert_eq!(tokio_test::block_on(ResponseFuture::waiting(1, rx1)), Ok(json!(1)));
        assert_eq!(tokio_test::block_on(ResponseFuture::waiting(2, rx2)), Ok(json!(2)));
    }

    #[test]
    fn test_unanswered_stays_pending() {
        let mut table = PendingRequests::default();
        let rx = table.register(1, "Player:init").unwrap();
        let mut fut = task::spawn(ResponseFuture::waiting(1, rx));
        assert_pending!(fut.poll());
        assert_pending!(fut.poll());
        assert!(table.age(1).is_some());
    }

    #[test]
    fn test_capacity_limit() {
        let mut table = PendingRequests::new(Some(1));
        let _rx = table.register(1, "Player:init").unwrap();
        assert_eq!(
            table.register(2, "Player:init").unwrap_err(),
            RequestError::TooManyPending(1)
        );
        table.settle(1, Ok(Value::Null));
        assert!(table.register(3, "Player:init").is_ok());
    }

    #[test]
    fn test_drain_rejects_all() {
        let mut table = PendingRequests::default();
        let rx1 = table.register(1, "Player:init").unwrap();
        let rx2 = table.register(2, "Player:adStopped").unwrap();
        assert_eq!(table.drain(&RequestError::Closed), 2);
        assert!(table.is_empty());
        assert_eq!(
            tokio_test::block_on(ResponseFuture::waiting(1, rx1)),
            Err(RequestError::Closed)
        );
        assert_eq!(
            tokio_test::block_on(ResponseFuture::waiting(2, rx2)),
            Err(RequestError::Closed)
        );
    }

    #[test]
    fn test_dropped_table_closes_future() {
        let mut table = PendingRequests::default();
        let rx = table.register(1, "Player:init").unwrap();
        drop(table);
        assert_eq!(
            tokio_test::block_on(ResponseFuture::waiting(1, rx)),
            Err(RequestError::Closed)
        );
    }

    #[test]
    fn test_ready_future_is_fused() {
        let mut fut = ResponseFuture::ready(3, Ok(Value::Null));
        assert!(!fut.is_terminated());
        assert_eq!(tokio_test::block_on(&mut fut), Ok(Value::Null));
        assert!(fut.is_terminated());
        assert!(!fut.awaits_reply());
    }
}
