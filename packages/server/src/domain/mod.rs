//! ドメイン層
//!
//! - `value_object`: 検証済みの値（ID、表示名、色など）
//! - `entity`: Identity / Participant / Room
//! - `repository`: Participant Registry / Room Manager のデータアクセス trait
//! - `message_pusher`: クライアントへの通知 trait
//! - `factory`: ID と Identity の生成

pub mod entity;
pub mod error;
pub mod factory;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{
    ChatEntry, DEFAULT_CHAT_CAPACITY, DEFAULT_PARTICIPANT_CAPACITY, Departure, Identity,
    Membership, Participant, ParticipantPatch, Room, RoomSettings,
};
pub use error::{MessagePushError, RepositoryError, RoomError, ValueObjectError};
pub use factory::{IdentityFactory, ParticipantIdFactory, UserIdFactory};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{Admission, Patched, Removal, RoomRepository, SnapshotHook};
pub use value_object::{
    ChatText, Color, DisplayName, ParticipantId, Position, RoomId, Timestamp, UserId,
};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
