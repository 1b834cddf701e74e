//! gRPC surface of ChittyChat: the `ChittyChat` service, the server bootstrap
//! and a small client.

pub mod grpc;

pub use grpc::{serve, serve_with_listener, Accepted, ChatClient, ChatServiceImpl, ReceivedMessage, Subscription};
