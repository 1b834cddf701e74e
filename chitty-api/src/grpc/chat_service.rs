use std::sync::Arc;

use async_trait::async_trait;
use chitty_core::{ChatMessage, Error, HubConfig};
use chitty_hub::{Broadcaster, MessageSink, SubscriptionSession};
use chitty_proto::chitty_chat_server::ChittyChat;
use chitty_proto::{ChatAccept, SubMessage};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tonic::{Request, Response, Status};

use super::convert;

type OutboundItem = Result<chitty_proto::ChatMessage, Status>;

/// Outbound half of a Subscribe response stream
struct GrpcSink(mpsc::Sender<OutboundItem>);

#[async_trait]
impl MessageSink for GrpcSink {
    async fn send(&mut self, message: ChatMessage) -> chitty_core::Result<()> {
        self.0
            .send(Ok(convert::message_to_proto(message)))
            .await
            .map_err(|_| Error::StreamClosed("client disconnected".to_string()))
    }

    async fn closed(&self) {
        self.0.closed().await;
    }
}

/// ChittyChat service implementation
#[derive(Clone)]
pub struct ChatServiceImpl {
    server_name: Arc<str>,
    broadcaster: Arc<Broadcaster>,
    hub_config: Arc<HubConfig>,
    shutdown: CancellationToken,
    sessions: TaskTracker,
}

impl ChatServiceImpl {
    pub fn new(
        server_name: impl Into<Arc<str>>,
        broadcaster: Arc<Broadcaster>,
        hub_config: HubConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            broadcaster,
            hub_config: Arc::new(hub_config),
            shutdown,
            sessions: TaskTracker::new(),
        }
    }

    #[must_use]
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Wait for every subscribe session to finish. Sessions end once the
    /// shutdown token fires, so call this after cancelling it.
    pub async fn wait_for_sessions(&self) {
        self.sessions.close();
        self.sessions.wait().await;
    }
}

#[tonic::async_trait]
impl ChittyChat for ChatServiceImpl {
    type SubscribeStream = ReceiverStream<OutboundItem>;

    async fn subscribe(
        &self,
        request: Request<SubMessage>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        let req = request.into_inner();

        let session =
            SubscriptionSession::open(self.broadcaster.clone(), req.client_name.clone(), req.timestamp)
                .map_err(|e| {
                    tracing::warn!(
                        client_name = %req.client_name,
                        error = %e,
                        "Subscribe rejected"
                    );
                    Status::from(e)
                })?;

        tracing::info!(
            client_name = %req.client_name,
            subscriber_id = %session.subscriber_id(),
            observed = req.timestamp,
            "Client establishing Subscribe stream"
        );

        let (outgoing_tx, outgoing_rx) = mpsc::channel(self.hub_config.outbound_buffer.max(1));

        // Lives until the client disconnects or the server shuts down
        self.sessions
            .spawn(session.run(GrpcSink(outgoing_tx), self.shutdown.clone()));

        Ok(Response::new(ReceiverStream::new(outgoing_rx)))
    }

    async fn publish(
        &self,
        request: Request<chitty_proto::ChatMessage>,
    ) -> Result<Response<ChatAccept>, Status> {
        let req = request.into_inner();

        if req.client_name.trim().is_empty() {
            return Err(Error::InvalidArgument("client_name must not be empty".to_string()).into());
        }
        if req.message.len() > self.hub_config.max_message_len {
            return Err(Error::InvalidArgument(format!(
                "message exceeds {} bytes",
                self.hub_config.max_message_len
            ))
            .into());
        }

        let message = self.broadcaster.broadcast(convert::draft_from_proto(req));

        tracing::debug!(
            sender = %message.sender(),
            timestamp = message.timestamp(),
            "Message published"
        );

        Ok(Response::new(ChatAccept {
            server_name: self.server_name.to_string(),
            timestamp: message.timestamp(),
        }))
    }
}
