use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chitty_core::{ChatMessage, LamportClock, MessageDraft, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::registry::{DeliveryReceiver, SubscriberId, SubscriptionRegistry};

/// Counters for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub subscribers: usize,
    pub broadcasts: u64,
    pub delivered: u64,
    pub dropped: u64,
}

/// Stamps messages with the shared clock and fans them out to every
/// registered subscriber.
///
/// Stamping and delivery of one message happen under a single fan-out guard,
/// and so do membership changes made through [`subscribe`](Self::subscribe)
/// and [`unsubscribe`](Self::unsubscribe). Every channel therefore receives
/// messages in timestamp order, and nothing reaches a subscriber after its
/// removal returns. Delivery is `try_send` only, so the guard is never held
/// across a blocking write: a full channel loses the message instead of
/// stalling everyone else.
pub struct Broadcaster {
    clock: Arc<LamportClock>,
    registry: Arc<SubscriptionRegistry>,
    fanout: Mutex<()>,
    broadcasts: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Broadcaster {
    #[must_use]
    pub fn new(clock: Arc<LamportClock>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            clock,
            registry,
            fanout: Mutex::new(()),
            broadcasts: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<LamportClock> {
        &self.clock
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Register a subscriber; it receives every message broadcast after this
    /// returns.
    pub fn subscribe(&self, client_name: &str) -> Result<(SubscriberId, DeliveryReceiver)> {
        let _fanout = self.fanout.lock();
        self.registry.register(client_name)
    }

    /// Remove a subscriber; it receives nothing broadcast after this returns.
    /// Safe to call more than once.
    pub fn unsubscribe(&self, id: &str) -> bool {
        let _fanout = self.fanout.lock();
        self.registry.unregister(id)
    }

    /// Stamp `draft` with the next clock value and deliver it to every
    /// subscriber. Returns the stamped message.
    pub fn broadcast(&self, draft: MessageDraft) -> ChatMessage {
        let _fanout = self.fanout.lock();

        let timestamp = self.clock.advance(draft.observed);
        let message = draft.stamp(timestamp);

        let mut delivered = 0u64;
        let mut dropped = 0u64;
        let mut closed = Vec::new();

        for subscriber in self.registry.snapshot() {
            match subscriber.sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    warn!(
                        subscriber_id = %subscriber.id,
                        client_name = %subscriber.client_name,
                        timestamp,
                        "Delivery channel full, dropping message"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    dropped += 1;
                    debug!(
                        subscriber_id = %subscriber.id,
                        client_name = %subscriber.client_name,
                        "Delivery channel closed, marking for cleanup"
                    );
                    closed.push(subscriber.id);
                }
            }
        }

        for id in closed {
            self.registry.unregister(&id);
        }

        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(delivered, Ordering::Relaxed);
        self.dropped.fetch_add(dropped, Ordering::Relaxed);

        debug!(
            sender = %message.sender(),
            timestamp,
            delivered,
            dropped,
            "Broadcast complete"
        );

        message
    }

    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.registry.len(),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
