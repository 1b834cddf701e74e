use std::collections::HashMap;

use chitty_core::{ChatMessage, Error, HubConfig, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Handle for one subscribe call
pub type SubscriberId = String;

/// Sending half of a subscriber's delivery channel
pub type DeliverySender = mpsc::Sender<ChatMessage>;

/// Receiving half of a subscriber's delivery channel, drained by its pump
pub type DeliveryReceiver = mpsc::Receiver<ChatMessage>;

/// Subscriber information
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub client_name: String,
    pub sender: DeliverySender,
}

/// Live set of subscriber delivery channels.
///
/// All structural changes happen under one lock. Readers never iterate the
/// map itself: [`snapshot`](Self::snapshot) copies it out, so a broadcast in
/// flight is unaffected by concurrent register/unregister calls.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    channel_capacity: usize,
    max_subscribers: usize,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new(channel_capacity: usize, max_subscribers: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
            max_subscribers,
        }
    }

    #[must_use]
    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(config.channel_capacity, config.max_subscribers)
    }

    /// Allocate a delivery channel and add it to the live set
    pub fn register(&self, client_name: &str) -> Result<(SubscriberId, DeliveryReceiver)> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let id = nanoid::nanoid!(16);

        let total = {
            let mut subscribers = self.subscribers.lock();
            if subscribers.len() >= self.max_subscribers {
                return Err(Error::CapacityExceeded(format!(
                    "Server at capacity ({} subscribers)",
                    self.max_subscribers
                )));
            }
            subscribers.insert(
                id.clone(),
                Subscriber {
                    id: id.clone(),
                    client_name: client_name.to_string(),
                    sender: tx,
                },
            );
            subscribers.len()
        };

        info!(
            subscriber_id = %id,
            client_name = %client_name,
            total_subscribers = total,
            "Subscriber registered"
        );

        Ok((id, rx))
    }

    /// Remove a subscriber. Unknown ids are ignored.
    ///
    /// Returns whether anything was removed.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.subscribers.lock().remove(id);

        match removed {
            Some(subscriber) => {
                info!(
                    subscriber_id = %id,
                    client_name = %subscriber.client_name,
                    "Subscriber unregistered"
                );
                true
            }
            None => {
                debug!(subscriber_id = %id, "Subscriber already unregistered");
                false
            }
        }
    }

    /// Point-in-time copy of the live subscribers
    #[must_use]
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.lock().values().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.subscribers.lock().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::from_config(&HubConfig::default())
    }
}
