//! Per-connection subscriber pump
//!
//! Drains one subscriber's delivery channel onto its outbound stream so that
//! slow network writes never sit on the broadcast path.
//!
//! ```text
//! Active --(write error | stream gone | cancelled)--> Draining --(unsubscribe)--> Closed
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chitty_core::{ChatMessage, Error, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::broadcaster::Broadcaster;
use crate::registry::{DeliveryReceiver, SubscriberId};

/// Outbound side of a subscriber connection
#[async_trait]
pub trait MessageSink: Send + Sync + 'static {
    /// Write one message to the client
    async fn send(&mut self, message: ChatMessage) -> Result<()>;

    /// Resolves once the client side of the stream has gone away
    async fn closed(&self);
}

#[async_trait]
impl MessageSink for mpsc::Sender<ChatMessage> {
    async fn send(&mut self, message: ChatMessage) -> Result<()> {
        mpsc::Sender::send(self, message)
            .await
            .map_err(|_| Error::StreamClosed("receiver dropped".to_string()))
    }

    async fn closed(&self) {
        mpsc::Sender::closed(self).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Active,
    Draining,
    Closed,
}

/// Why a pump left the active state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    /// Connection or server shutdown was cancelled
    Cancelled,
    /// Client disconnected
    StreamClosed,
    /// Writing to the client failed
    WriteFailed,
    /// Delivery channel ended because the subscriber was unregistered
    ChannelClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpExit {
    pub subscriber_id: SubscriberId,
    pub state: PumpState,
    pub reason: DrainReason,
    pub forwarded: u64,
}

pub struct SubscriberPump<S> {
    subscriber_id: SubscriberId,
    delivery: DeliveryReceiver,
    sink: S,
    broadcaster: Arc<Broadcaster>,
    cancel: CancellationToken,
    state: PumpState,
    forwarded: u64,
}

impl<S: MessageSink> SubscriberPump<S> {
    pub fn new(
        subscriber_id: SubscriberId,
        delivery: DeliveryReceiver,
        sink: S,
        broadcaster: Arc<Broadcaster>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            subscriber_id,
            delivery,
            sink,
            broadcaster,
            cancel,
            state: PumpState::Active,
            forwarded: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Run the pump on its own task
    pub fn spawn(self) -> JoinHandle<PumpExit> {
        tokio::spawn(self.run())
    }

    /// Forward messages until the stream ends, then unsubscribe.
    ///
    /// Messages are forwarded exactly as the broadcaster stamped them.
    pub async fn run(mut self) -> PumpExit {
        let reason = loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break DrainReason::Cancelled,
                () = self.sink.closed() => break DrainReason::StreamClosed,
                next = self.delivery.recv() => next,
            };

            let Some(message) = next else {
                break DrainReason::ChannelClosed;
            };

            // A client that stops reading can park this write indefinitely
            let written = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break DrainReason::Cancelled,
                written = self.sink.send(message) => written,
            };

            if let Err(err) = written {
                debug!(
                    subscriber_id = %self.subscriber_id,
                    error = %err,
                    "Failed to write to subscriber stream"
                );
                break DrainReason::WriteFailed;
            }
            self.forwarded += 1;
        };

        self.transition(PumpState::Draining, reason);

        // Queued but unsent messages go away with the receiver
        self.delivery.close();
        self.broadcaster.unsubscribe(&self.subscriber_id);
        self.transition(PumpState::Closed, reason);

        PumpExit {
            subscriber_id: self.subscriber_id,
            state: self.state,
            reason,
            forwarded: self.forwarded,
        }
    }

    fn transition(&mut self, to: PumpState, reason: DrainReason) {
        debug!(
            subscriber_id = %self.subscriber_id,
            from = ?self.state,
            to = ?to,
            reason = ?reason,
            forwarded = self.forwarded,
            "Subscriber pump state change"
        );
        self.state = to;
    }
}
