use std::sync::Arc;

use chitty_core::clock::Timestamp;
use chitty_core::{Error, MessageDraft, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::broadcaster::Broadcaster;
use crate::pump::{MessageSink, PumpExit, SubscriberPump};
use crate::registry::{DeliveryReceiver, SubscriberId};

/// Result of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub subscriber_id: SubscriberId,
    pub joined_at: Timestamp,
    pub left_at: Timestamp,
    /// Pump outcome, `None` if the pump task panicked
    pub pump: Option<PumpExit>,
}

/// One subscribe call from registration to the "left" notice
pub struct SubscriptionSession {
    broadcaster: Arc<Broadcaster>,
    subscriber_id: SubscriberId,
    client_name: String,
    initial_timestamp: Timestamp,
    delivery: DeliveryReceiver,
}

impl SubscriptionSession {
    /// Register a new subscriber.
    ///
    /// Nothing is broadcast yet; the join notice goes out from [`run`](Self::run).
    pub fn open(
        broadcaster: Arc<Broadcaster>,
        client_name: impl Into<String>,
        initial_timestamp: Timestamp,
    ) -> Result<Self> {
        let client_name = client_name.into();
        if client_name.trim().is_empty() {
            return Err(Error::InvalidArgument("client_name must not be empty".to_string()));
        }

        let (subscriber_id, delivery) = broadcaster.subscribe(&client_name)?;

        Ok(Self {
            broadcaster,
            subscriber_id,
            client_name,
            initial_timestamp,
            delivery,
        })
    }

    #[must_use]
    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Start the pump, announce the join and wait for the connection to end.
    ///
    /// The pump is the disconnect detector: it returns when the client goes
    /// away, a write fails or `shutdown` fires. The pump task is cancelled if
    /// this future is dropped early.
    pub async fn run<S: MessageSink>(self, sink: S, shutdown: CancellationToken) -> SessionSummary {
        let Self {
            broadcaster,
            subscriber_id,
            client_name,
            initial_timestamp,
            delivery,
        } = self;

        let cancel = shutdown.child_token();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let pump = SubscriberPump::new(
            subscriber_id.clone(),
            delivery,
            sink,
            broadcaster.clone(),
            cancel,
        )
        .spawn();

        // The join event's single clock advance happens in this broadcast
        let joined = broadcaster.broadcast(MessageDraft::joined(&client_name, initial_timestamp));
        info!(
            subscriber_id = %subscriber_id,
            client_name = %client_name,
            timestamp = joined.timestamp(),
            "Client joined"
        );

        let pump = match pump.await {
            Ok(exit) => Some(exit),
            Err(err) => {
                error!(
                    subscriber_id = %subscriber_id,
                    error = %err,
                    "Subscriber pump task failed"
                );
                None
            }
        };

        // Already done by the pump unless it panicked
        broadcaster.unsubscribe(&subscriber_id);

        let left = broadcaster.broadcast(MessageDraft::left(&client_name));
        info!(
            subscriber_id = %subscriber_id,
            client_name = %client_name,
            timestamp = left.timestamp(),
            "Client left"
        );

        SessionSummary {
            subscriber_id,
            joined_at: joined.timestamp(),
            left_at: left.timestamp(),
            pump,
        }
    }
}
