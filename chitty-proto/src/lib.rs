//! ChittyChat Protocol Definitions
//!
//! Generated protobuf messages plus the tonic client and server for the
//! `chittychat.ChittyChat` service.

#[allow(clippy::all)]
#[allow(warnings)]
mod generated {
    tonic::include_proto!("chittychat");
}

pub use generated::*;

/// Encoded file descriptor set, registered with the reflection service
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("chittychat_descriptor");
