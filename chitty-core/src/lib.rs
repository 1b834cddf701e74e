//! Core types shared by the ChittyChat server and client: the Lamport clock,
//! the chat message model, errors, configuration and logging setup.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;

pub use clock::LamportClock;
pub use config::{Config, HubConfig, LoggingConfig, ServerConfig};
pub use error::{Error, Result};
pub use models::{ChatMessage, MessageDraft};
