//! Conversions between proto messages and core models

use chitty_core::{ChatMessage, MessageDraft};
use chitty_proto as proto;

pub fn message_to_proto(message: ChatMessage) -> proto::ChatMessage {
    let (client_name, timestamp, message) = message.into_parts();
    proto::ChatMessage {
        client_name,
        timestamp,
        message,
    }
}

/// A published message, not yet stamped by the server
pub fn draft_from_proto(message: proto::ChatMessage) -> MessageDraft {
    MessageDraft::new(message.client_name, message.message).observed(message.timestamp)
}

/// A message received from the server, already stamped
pub fn message_from_proto(message: proto::ChatMessage) -> ChatMessage {
    MessageDraft::new(message.client_name, message.message).stamp(message.timestamp)
}
