//! Receive pump: feeds inbound text into an endpoint.

use futures::{Stream, StreamExt};
use simid_protocol::Endpoint;
use tokio::task::JoinHandle;

use crate::channel::{Inbox, channel};

/// Forward every text from `inbox` to `endpoint`, in arrival order.
///
/// The task ends when every sender for the inbox is gone and returns the
/// number of texts forwarded.
pub fn spawn_receiver(endpoint: &Endpoint, inbox: Inbox) -> JoinHandle<usize> {
    spawn_stream_receiver(endpoint, inbox.into_stream())
}

/// Forward a stream of inbound texts to `endpoint`.
///
/// The task only holds the endpoint weakly. Once every `Endpoint` handle is
/// dropped it stops at the next inbound text, or as soon as the stream ends.
pub fn spawn_stream_receiver<S>(endpoint: &Endpoint, stream: S) -> JoinHandle<usize>
where
    S: Stream<Item = String> + Send + 'static,
{
    let role = endpoint.role();
    let endpoint = endpoint.downgrade();
    tokio::spawn(async move {
        tokio::pin!(stream);

        let mut forwarded = 0;
        while let Some(text) = stream.next().await {
            let Some(endpoint) = endpoint.upgrade() else {
                tracing::debug!(?role, forwarded, "Endpoint dropped, stopping receive pump");
                return forwarded;
            };
            endpoint.receive_message(&text);
            forwarded += 1;
        }
        tracing::debug!(?role, forwarded, "Receive pump finished");
        forwarded
    })
}

/// Pump handles for a connected endpoint pair.
#[derive(Debug)]
pub struct Link {
    pub host_pump: JoinHandle<usize>,
    pub guest_pump: JoinHandle<usize>,
}

/// Wire `host` and `guest` to each other and start both pumps.
///
/// Each side's message target is replaced. Closing or dropping one endpoint
/// drops its sender, which ends the other side's pump.
#[must_use]
pub fn connect(host: &Endpoint, guest: &Endpoint) -> Link {
    let (to_guest, guest_inbox) = channel();
    let (to_host, host_inbox) = channel();
    host.set_message_target(std::sync::Arc::new(to_guest));
    guest.set_message_target(std::sync::Arc::new(to_host));

    Link {
        host_pump: spawn_receiver(host, host_inbox),
        guest_pump: spawn_receiver(guest, guest_inbox),
    }
}
