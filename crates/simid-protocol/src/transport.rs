//! Outbound transport seam.

use std::sync::Arc;

use crate::error::TransportError;

/// Where an endpoint posts its outbound text.
///
/// Delivery is fire-and-forget: `Ok` means the text was handed off, not that
/// the peer received it. Implementations should report a gone peer as
/// [`TransportError::Disconnected`] when they can tell.
pub trait Transport: Send + Sync {
    /// Post one serialized envelope.
    ///
    /// # Errors
    /// Returns error if the text could not be handed to the peer.
    fn post(&self, text: String) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(&self, text: String) -> Result<(), TransportError> {
        (**self).post(text)
    }
}
