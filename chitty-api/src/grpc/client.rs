//! ChittyChat gRPC client
//!
//! Keeps a client-side Lamport clock: every message received from the server
//! advances it with the message's timestamp, and every publish advances it
//! once and sends the new value as the observed timestamp.

use std::sync::Arc;
use std::time::Duration;

use chitty_core::clock::Timestamp;
use chitty_core::{ChatMessage, Error, LamportClock, Result};
use chitty_proto::chitty_chat_client::ChittyChatClient;
use chitty_proto::SubMessage;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use super::convert;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Acknowledgment for a published message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub server_name: String,
    pub timestamp: Timestamp,
}

/// A message read from the subscription, with the local clock value after
/// observing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message: ChatMessage,
    pub local_time: Timestamp,
}

/// Live Subscribe stream
pub struct Subscription {
    stream: tonic::Streaming<chitty_proto::ChatMessage>,
    clock: Arc<LamportClock>,
}

impl Subscription {
    /// Next broadcast message, `None` once the server ends the stream
    pub async fn next(&mut self) -> Result<Option<ReceivedMessage>> {
        let Some(message) = self.stream.message().await.map_err(status_error)? else {
            return Ok(None);
        };

        let local_time = self.clock.advance(message.timestamp);
        Ok(Some(ReceivedMessage {
            message: convert::message_from_proto(message),
            local_time,
        }))
    }
}

#[derive(Clone)]
pub struct ChatClient {
    inner: ChittyChatClient<Channel>,
    name: String,
    clock: Arc<LamportClock>,
}

impl ChatClient {
    /// Connect to a server. `address` may omit the scheme (`127.0.0.1:5400`).
    pub async fn connect(address: &str, name: impl Into<String>) -> Result<Self> {
        let uri = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };

        let channel = Endpoint::from_shared(uri)
            .map_err(|e| Error::Transport(format!("Invalid server address {address}: {e}")))?
            .connect_timeout(CONNECT_TIMEOUT)
            .connect()
            .await
            .map_err(|e| Error::Transport(format!("Failed to connect to {address}: {e}")))?;

        Ok(Self::with_channel(channel, name))
    }

    pub fn with_channel(channel: Channel, name: impl Into<String>) -> Self {
        Self {
            inner: ChittyChatClient::new(channel),
            name: name.into(),
            clock: Arc::new(LamportClock::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<LamportClock> {
        &self.clock
    }

    /// Open the live stream of broadcast messages
    pub async fn subscribe(&self) -> Result<Subscription> {
        let request = SubMessage {
            client_name: self.name.clone(),
            timestamp: self.clock.tick(),
        };

        let stream = self
            .inner
            .clone()
            .subscribe(request)
            .await
            .map_err(status_error)?
            .into_inner();

        debug!(client_name = %self.name, "Subscribed");

        Ok(Subscription {
            stream,
            clock: self.clock.clone(),
        })
    }

    /// Publish one message and observe the timestamp the server assigned
    pub async fn publish(&self, body: impl Into<String>) -> Result<Accepted> {
        let request = chitty_proto::ChatMessage {
            client_name: self.name.clone(),
            timestamp: self.clock.tick(),
            message: body.into(),
        };

        let ack = self
            .inner
            .clone()
            .publish(request)
            .await
            .map_err(status_error)?
            .into_inner();

        self.clock.advance(ack.timestamp);

        Ok(Accepted {
            server_name: ack.server_name,
            timestamp: ack.timestamp,
        })
    }
}

fn status_error(status: tonic::Status) -> Error {
    match status.code() {
        tonic::Code::InvalidArgument => Error::InvalidArgument(status.message().to_string()),
        tonic::Code::ResourceExhausted => Error::CapacityExceeded(status.message().to_string()),
        tonic::Code::Cancelled => Error::StreamClosed(status.message().to_string()),
        _ => Error::Transport(status.to_string()),
    }
}
