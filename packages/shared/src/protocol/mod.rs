//! Keyroom wire protocol.
//!
//! - `message`: typed envelope (`Message`) and its payloads
//! - `codec`: frame encoding/decoding

pub mod codec;
pub mod message;

pub use codec::{DecodeError, EncodeError, decode_frame, encode_frame, encode_message};
pub use message::{
    ChatMessage, DEFAULT_ACCENT_COLOR, Handshake, Identity, InputAction, InputBatch, InputEvent,
    JoinRoom, Message, OFFLINE_ACCENT_COLOR, ParticipantInfo, PresenceLeft, PresencePatch,
    PresenceUpdate, RoomSettings, RoomState, TimeSync,
};
