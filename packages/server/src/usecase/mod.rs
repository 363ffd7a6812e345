//! UseCase 層
//!
//! 各ユースケースはドメイン層の trait（`RoomRepository`, `MessagePusher`）にだけ依存し、
//! 処理結果として通知対象（`UserId`）を返します。フレームの組み立ては UI 層が行います。

pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod get_rooms;
pub mod join_room;
pub mod leave_room;
pub mod relay_input;
pub mod send_chat;
pub mod update_presence;

pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{JoinError, ProtocolViolation, SendChatError};
pub use get_rooms::{GetRoomDetailError, GetRoomDetailUseCase, GetRoomsUseCase};
pub use join_room::JoinRoomUseCase;
pub use leave_room::{LeaveRoomUseCase, remaining_members};
pub use relay_input::RelayInputUseCase;
pub use send_chat::{ChatDelivery, SendChatUseCase};
pub use update_presence::{PresenceChange, UpdatePresenceUseCase};
