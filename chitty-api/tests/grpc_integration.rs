//! End-to-end tests against a real gRPC server on a loopback port
//!
//! Run with: cargo test -p chitty-api --test grpc_integration

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chitty_api::{serve_with_listener, ChatClient, ReceivedMessage, Subscription};
use chitty_core::{Config, Error, LamportClock};
use chitty_hub::{Broadcaster, SubscriptionRegistry};
use chitty_proto::chitty_chat_client::ChittyChatClient;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestServer {
    addr: SocketAddr,
    broadcaster: Arc<Broadcaster>,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let mut config = Config::default();
        config.server.name = "test-server".to_string();
        config.server.port = 0;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let broadcaster = Arc::new(Broadcaster::new(
            Arc::new(LamportClock::new()),
            Arc::new(SubscriptionRegistry::from_config(&config.hub)),
        ));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn({
            let broadcaster = broadcaster.clone();
            let shutdown = shutdown.clone();
            async move { serve_with_listener(listener, &config, broadcaster, shutdown).await }
        });

        Self {
            addr,
            broadcaster,
            shutdown,
            handle,
        }
    }

    async fn client(&self, name: &str) -> ChatClient {
        ChatClient::connect(&self.addr.to_string(), name).await.unwrap()
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not shut down")
            .unwrap()
            .unwrap();
    }
}

async fn recv(subscription: &mut Subscription) -> ReceivedMessage {
    tokio::time::timeout(Duration::from_secs(2), subscription.next())
        .await
        .expect("timed out waiting for a message")
        .unwrap()
        .expect("stream ended")
}

/// Subscribe and wait for our own join notice so later broadcasts reach us
async fn subscribed(client: &ChatClient) -> (Subscription, ReceivedMessage) {
    let mut subscription = client.subscribe().await.unwrap();
    let joined = recv(&mut subscription).await;
    assert_eq!(joined.message.body(), format!("User {} subscribed", client.name()));
    (subscription, joined)
}

#[tokio::test]
async fn test_publishes_arrive_in_timestamp_order() {
    let server = TestServer::start().await;
    let carol = server.client("carol").await;
    let (mut watcher, joined) = subscribed(&carol).await;
    // carol's subscribe carried her ticked clock (1), so the join lands at 2
    assert_eq!(joined.message.timestamp(), 2);

    let mut raw = ChittyChatClient::connect(format!("http://{}", server.addr))
        .await
        .unwrap();
    let a = raw
        .publish(chitty_proto::ChatMessage {
            client_name: "alice".to_string(),
            timestamp: 0,
            message: "from alice".to_string(),
        })
        .await
        .unwrap()
        .into_inner();
    let b = raw
        .publish(chitty_proto::ChatMessage {
            client_name: "bob".to_string(),
            timestamp: 0,
            message: "from bob".to_string(),
        })
        .await
        .unwrap()
        .into_inner();

    assert_eq!(a.server_name, "test-server");
    assert_eq!(a.timestamp, 3);
    assert_eq!(b.timestamp, 4);

    let first = recv(&mut watcher).await;
    let second = recv(&mut watcher).await;
    assert_eq!(first.message.sender(), "alice");
    assert_eq!(first.message.timestamp(), 3);
    assert_eq!(second.message.sender(), "bob");
    assert_eq!(second.message.timestamp(), 4);

    // The watcher's own clock moved past everything it observed
    assert!(carol.clock().current() > 4);

    server.stop().await;
}

#[tokio::test]
async fn test_every_subscriber_receives_one_copy() {
    let server = TestServer::start().await;

    let mut clients = Vec::new();
    let mut subscriptions = Vec::new();
    for name in ["a", "b", "c"] {
        let client = server.client(name).await;
        let (subscription, _) = subscribed(&client).await;
        clients.push(client);
        subscriptions.push(subscription);
    }

    // Earlier subscribers also saw the later join notices; skip past them
    for (i, subscription) in subscriptions.iter_mut().enumerate() {
        for _ in i + 1..3 {
            recv(subscription).await;
        }
    }

    let publisher = server.client("publisher").await;
    let ack = publisher.publish("hello everyone").await.unwrap();

    for subscription in &mut subscriptions {
        let received = recv(subscription).await;
        assert_eq!(received.message.body(), "hello everyone");
        assert_eq!(received.message.timestamp(), ack.timestamp);

        let extra = tokio::time::timeout(Duration::from_millis(100), subscription.next()).await;
        assert!(extra.is_err(), "expected exactly one copy");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_publishes_seen_in_one_order() {
    let server = TestServer::start().await;
    let watcher_client = server.client("watcher").await;
    let (mut watcher, _) = subscribed(&watcher_client).await;

    let alice = server.client("alice").await;
    let bob = server.client("bob").await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = if i % 2 == 0 { alice.clone() } else { bob.clone() };
        tasks.push(tokio::spawn(async move {
            client.publish(format!("message {i}")).await.unwrap().timestamp
        }));
    }

    let mut acked = HashSet::new();
    for task in tasks {
        assert!(acked.insert(task.await.unwrap()), "duplicate timestamp");
    }

    let mut last = 0;
    let mut seen = HashSet::new();
    for _ in 0..20 {
        let received = recv(&mut watcher).await;
        assert!(received.message.timestamp() > last);
        last = received.message.timestamp();
        seen.insert(last);
    }
    assert_eq!(seen, acked);

    server.stop().await;
}

#[tokio::test]
async fn test_join_and_leave_notices() {
    let server = TestServer::start().await;
    let alice = server.client("alice").await;
    let (mut alice_stream, alice_joined) = subscribed(&alice).await;

    let bob = server.client("bob").await;
    let (bob_stream, _) = subscribed(&bob).await;

    let bob_joined = recv(&mut alice_stream).await;
    assert_eq!(bob_joined.message.body(), "User bob subscribed");
    assert!(bob_joined.message.timestamp() > alice_joined.message.timestamp());

    drop(bob_stream);

    let bob_left = recv(&mut alice_stream).await;
    assert_eq!(bob_left.message.sender(), "bob");
    assert_eq!(bob_left.message.body(), "User bob left the server");
    assert!(bob_left.message.timestamp() > bob_joined.message.timestamp());

    assert_eq!(server.broadcaster.registry().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let server = TestServer::start().await;

    let nameless = server.client("").await;
    let err = nameless.publish("hi").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = nameless.subscribe().await.err().unwrap();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let alice = server.client("alice").await;
    let err = alice.publish("x".repeat(5000)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    assert_eq!(server.broadcaster.clock().current(), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let server = TestServer::start().await;
    let alice = server.client("alice").await;
    let (mut stream, _) = subscribed(&alice).await;

    let broadcaster = server.broadcaster.clone();
    server.stop().await;

    assert!(broadcaster.registry().is_empty());

    // The stream either ends cleanly or reports the closed connection
    let next = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("stream still open after shutdown");
    assert!(!matches!(next, Ok(Some(_))));
}
