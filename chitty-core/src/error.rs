//! Error types for ChittyChat

use thiserror::Error;

/// ChittyChat error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Stream closed: {0}")]
    StreamClosed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ChittyChat operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgument(msg) => Self::invalid_argument(msg),
            Error::CapacityExceeded(msg) => Self::resource_exhausted(msg),
            Error::StreamClosed(msg) => Self::cancelled(msg),
            other => Self::internal(other.to_string()),
        }
    }
}
