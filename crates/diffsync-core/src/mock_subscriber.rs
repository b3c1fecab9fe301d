//! Mock subscriber for testing
//!
//! Delivers patch messages into an in-memory channel so tests can assert on
//! what a client would have received, without a real transport.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diffsync_core::{MockSubscriber, PatchMessage, Subscriber};
//!
//! let (subscriber, mut inbox) = MockSubscriber::<String>::new("client1");
//! subscriber.patched(PatchMessage::new("doc", "client1", vec![])).await.unwrap();
//! let message = inbox.recv().await.unwrap();
//! assert_eq!(message.client_id, "client1");
//! ```

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::edit::PatchMessage;
use crate::error::DeliveryError;
use crate::traits::Subscriber;

/// A subscriber backed by an unbounded in-memory channel
#[derive(Debug, Clone)]
pub struct MockSubscriber<D> {
    client_id: String,
    outbox: mpsc::UnboundedSender<PatchMessage<D>>,
}

impl<D> MockSubscriber<D> {
    /// Create a subscriber and the receiving end of its channel
    ///
    /// Dropping the receiver makes every later delivery fail with
    /// [`DeliveryError::ChannelClosed`].
    pub fn new(client_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<PatchMessage<D>>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let subscriber = Self {
            client_id: client_id.into(),
            outbox,
        };
        (subscriber, inbox)
    }
}

#[async_trait]
impl<D: Send + Sync + 'static> Subscriber<D> for MockSubscriber<D> {
    type Channel = mpsc::UnboundedSender<PatchMessage<D>>;

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn channel(&self) -> &Self::Channel {
        &self.outbox
    }

    async fn patched(&self, message: PatchMessage<D>) -> Result<(), DeliveryError> {
        self.outbox
            .send(message)
            .map_err(|_| DeliveryError::ChannelClosed(self.client_id.clone()))
    }
}
