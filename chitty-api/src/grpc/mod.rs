pub mod chat_service;
pub mod client;
pub mod convert;

pub use chat_service::ChatServiceImpl;
pub use client::{Accepted, ChatClient, ReceivedMessage, Subscription};

use std::sync::Arc;

use chitty_core::Config;
use chitty_hub::Broadcaster;
use chitty_proto::chitty_chat_server::ChittyChatServer;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;

/// Bind the configured address and run the gRPC server until `shutdown` fires
pub async fn serve(
    config: &Config,
    broadcaster: Arc<Broadcaster>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let address = config.grpc_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to listen on {address}: {e}"))?;

    serve_with_listener(listener, config, broadcaster, shutdown).await
}

/// Run the gRPC server on an already bound listener until `shutdown` fires.
///
/// Returns once the transport has stopped and every subscribe session has
/// been joined.
pub async fn serve_with_listener(
    listener: TcpListener,
    config: &Config,
    broadcaster: Arc<Broadcaster>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;

    let chat_service = ChatServiceImpl::new(
        config.server.name.as_str(),
        broadcaster,
        config.hub.clone(),
        shutdown.clone(),
    );

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<ChittyChatServer<ChatServiceImpl>>()
        .await;

    let reflection_service = if config.server.enable_reflection {
        let reflection = ReflectionBuilder::configure()
            .register_encoded_file_descriptor_set(chitty_proto::FILE_DESCRIPTOR_SET)
            .build_v1()
            .map_err(|e| anyhow::anyhow!("Failed to build reflection service: {e}"))?;

        tracing::info!("gRPC reflection enabled");
        Some(reflection)
    } else {
        None
    };

    tracing::info!(
        server_name = %config.server.name,
        address = %local_addr,
        "Starting gRPC server"
    );

    let serve_result = Server::builder()
        .add_service(ChittyChatServer::new(chat_service.clone()))
        .add_service(health_service)
        .add_optional_service(reflection_service)
        .serve_with_incoming_shutdown(
            TcpListenerStream::new(listener),
            shutdown.clone().cancelled_owned(),
        )
        .await;

    // Sessions only end on their own when clients leave; make sure they stop
    // even if the transport failed rather than shut down.
    shutdown.cancel();
    chat_service.wait_for_sessions().await;

    serve_result.map_err(|e| anyhow::anyhow!("gRPC server error: {e}"))?;

    tracing::info!(address = %local_addr, "gRPC server stopped");
    Ok(())
}
