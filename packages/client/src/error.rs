//! Error types for the Keyroom client.

use keyroom_shared::protocol::EncodeError;
use thiserror::Error;

/// Connection-scoped client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not establish the WebSocket connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The established transport failed
    #[error("Transport error: {0}")]
    TransportError(#[from] tokio_tungstenite::tungstenite::Error),

    /// An outbound frame could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// A local request that is not valid in the current session state.
///
/// These never close the connection; the request is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("not connected to the server")]
    NotConnected,

    #[error("not in a room")]
    NotInRoom,

    #[error("only the room owner may play while crown solo is enabled")]
    InputNotPermitted,

    #[error("chat is disabled in this room")]
    ChatDisabled,

    #[error("unexpected '{0}' message from the server")]
    UnexpectedKind(&'static str),
}
