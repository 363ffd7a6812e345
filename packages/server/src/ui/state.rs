//! Shared application state.

use std::sync::Arc;

use keyroom_shared::time::Clock;

use crate::{
    domain::{MessagePusher, RoomRepository},
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomDetailUseCase,
        GetRoomsUseCase, JoinRoomUseCase, LeaveRoomUseCase, RelayInputUseCase, SendChatUseCase,
        UpdatePresenceUseCase,
    },
};

/// Shared application state
///
/// One instance per server; every connection's session borrows it through an `Arc`.
pub struct AppState {
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    pub update_presence_usecase: Arc<UpdatePresenceUseCase>,
    pub relay_input_usecase: Arc<RelayInputUseCase>,
    pub send_chat_usecase: Arc<SendChatUseCase>,
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    /// サーバー時刻（`handshake` / `timeSync` の serverTime、入室時刻）
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire every use case to the given repository and pusher.
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                message_pusher.clone(),
            )),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            leave_room_usecase: Arc::new(LeaveRoomUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            update_presence_usecase: Arc::new(UpdatePresenceUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            relay_input_usecase: Arc::new(RelayInputUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            send_chat_usecase: Arc::new(SendChatUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                repository.clone(),
                message_pusher,
            )),
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(repository.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(repository)),
            clock,
        }
    }
}
