//! In-process transport over a tokio unbounded channel.
//!
//! Stands in for cross-window messaging: sends never block, per-sender order
//! is preserved, and a message posted after the receiving side is gone is
//! reported as `Disconnected`.

use simid_protocol::{Transport, TransportError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Sending half, installed as an endpoint's message target.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Whether the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn post(&self, text: String) -> Result<(), TransportError> {
        self.tx.send(text).map_err(|_| TransportError::Disconnected)
    }
}

/// Receiving half: inbound texts in arrival order.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<String>,
}

impl Inbox {
    /// Next inbound text, `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Convert into a stream.
    #[must_use]
    pub fn into_stream(self) -> UnboundedReceiverStream<String> {
        UnboundedReceiverStream::new(self.rx)
    }
}

/// Create a connected transport/inbox pair.
#[must_use]
pub fn channel() -> (ChannelTransport, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelTransport { tx }, Inbox { rx })
}
