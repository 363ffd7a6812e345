//! Frame codec.
//!
//! A frame is one JSON text message holding either a single message object or
//! an ordered array of them. Both shapes decode to the same `Vec<Message>`.
//! Encoders always emit the array shape.

use serde_json::Value;
use thiserror::Error;

use super::message::Message;

/// A frame could not be decoded. The caller logs it and drops the frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("frame must be a message object or an array of message objects")]
    InvalidStructure,

    #[error("entry {index} is not an object")]
    NotAnObject { index: usize },

    #[error("entry {index} has no string 'kind' discriminator")]
    MissingKind { index: usize },

    #[error("entry {index} is not a valid '{kind}' message: {source}")]
    InvalidMessage {
        index: usize,
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Messages could not be serialized into a frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to encode frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Encode an ordered list of messages into one frame.
pub fn encode_frame(messages: &[Message]) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(messages)?)
}

/// Encode a single message into a one-element frame.
pub fn encode_message(message: &Message) -> Result<String, EncodeError> {
    encode_frame(std::slice::from_ref(message))
}

/// Decode a frame into zero or more messages.
///
/// Entries with an unknown `kind` are skipped. Any structural problem fails the
/// whole frame.
pub fn decode_frame(frame: &str) -> Result<Vec<Message>, DecodeError> {
    let value: Value = serde_json::from_str(frame).map_err(DecodeError::InvalidJson)?;

    let entries = match value {
        Value::Array(entries) => entries,
        object @ Value::Object(_) => vec![object],
        _ => return Err(DecodeError::InvalidStructure),
    };

    let mut messages = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let kind = match &entry {
            Value::Object(map) => match map.get("kind").and_then(Value::as_str) {
                Some(kind) => kind.to_string(),
                None => return Err(DecodeError::MissingKind { index }),
            },
            _ => return Err(DecodeError::NotAnObject { index }),
        };

        if !Message::is_known_kind(&kind) {
            tracing::debug!("Ignoring message with unknown kind '{}'", kind);
            continue;
        }

        let message = serde_json::from_value::<Message>(entry).map_err(|source| {
            DecodeError::InvalidMessage {
                index,
                kind: kind.clone(),
                source,
            }
        })?;
        messages.push(message);
    }

    Ok(messages)
}
