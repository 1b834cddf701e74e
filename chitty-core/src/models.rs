use std::fmt;

use crate::clock::Timestamp;

/// A message that has not been stamped yet.
///
/// `observed` is the sender's view of the clock; the broadcaster feeds it to
/// [`LamportClock::advance`](crate::LamportClock::advance) when stamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender: String,
    pub body: String,
    pub observed: Timestamp,
}

impl MessageDraft {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            observed: 0,
        }
    }

    /// Set the timestamp the sender last observed
    #[must_use]
    pub fn observed(mut self, observed: Timestamp) -> Self {
        self.observed = observed;
        self
    }

    /// Notice broadcast when a client subscribes
    pub fn joined(client_name: &str, observed: Timestamp) -> Self {
        Self::new(client_name, format!("User {client_name} subscribed")).observed(observed)
    }

    /// Notice broadcast when a client's stream goes away
    pub fn left(client_name: &str) -> Self {
        Self::new(client_name, format!("User {client_name} left the server"))
    }

    /// Attach the timestamp assigned by the clock
    #[must_use]
    pub fn stamp(self, timestamp: Timestamp) -> ChatMessage {
        ChatMessage {
            sender: self.sender,
            timestamp,
            body: self.body,
        }
    }
}

/// A stamped chat message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    sender: String,
    timestamp: Timestamp,
    body: String,
}

impl ChatMessage {
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Split into `(sender, timestamp, body)`
    #[must_use]
    pub fn into_parts(self) -> (String, Timestamp, String) {
        (self.sender, self.timestamp, self.body)
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.timestamp, self.sender, self.body)
    }
}
