//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! RoomId をキーとする HashMap をインメモリ DB として使用します。
//!
//! 全ての変更操作は 1 つの Mutex で直列化されるため、同じ Room に対する
//! `admit` / `remove` / `update` には全順序がつきます。
//! コールバックはロックを保持したまま呼ばれます。
//! プロセス終了とともに全ての Room は失われます（永続化しない）。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    config::ServerConfig,
    domain::{
        Admission, ChatEntry, Identity, ParticipantId, ParticipantIdFactory, ParticipantPatch,
        Patched, Removal, RepositoryError, Room, RoomId, RoomRepository, RoomSettings,
        SnapshotHook, Timestamp,
    },
};

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    /// RoomId → Room
    rooms: Mutex<HashMap<RoomId, Room>>,
    /// 新規 Room の参加者上限
    room_capacity: usize,
    /// 新規 Room のチャット履歴件数
    chat_history: usize,
    /// 空になった Room を即座に回収するか
    reap_empty_rooms: bool,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            room_capacity: config.room_capacity,
            chat_history: config.chat_history,
            reap_empty_rooms: config.reap_empty_rooms,
        }
    }

    /// 現在保持している Room の数
    pub async fn count_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn admit_with_snapshot(
        &self,
        identity: &Identity,
        room_id: &RoomId,
        settings: Option<RoomSettings>,
        joined_at: Timestamp,
        on_admitted: SnapshotHook<'_>,
    ) -> Result<Admission, RepositoryError> {
        let mut rooms = self.rooms.lock().await;

        let created = !rooms.contains_key(room_id);
        let room = rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!("Room '{}' created", room_id.as_str());
            Room::with_capacity(
                room_id.clone(),
                settings.unwrap_or_default(),
                joined_at,
                self.room_capacity,
                self.chat_history,
            )
        });

        match room.admit(identity, joined_at, ParticipantIdFactory::generate) {
            Ok(participant) => {
                on_admitted(room, &participant);
                Ok(Admission {
                    participant,
                    room: room.clone(),
                    created,
                })
            }
            Err(e) => {
                // 入室に失敗した新規 Room は残さない
                if created {
                    rooms.remove(room_id);
                }
                Err(e.into())
            }
        }
    }

    async fn remove(&self, room_id: &RoomId, participant_id: &ParticipantId) -> Option<Removal> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.get_mut(room_id)?;
        let departure = room.remove(participant_id)?;

        if !room.is_active() && self.reap_empty_rooms {
            rooms.remove(room_id);
            tracing::info!("Room '{}' is empty and has been reaped", room_id.as_str());
            return Some(Removal {
                departure,
                room: None,
            });
        }

        Some(Removal {
            departure,
            room: Some(room.clone()),
        })
    }

    async fn update(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        patch: &ParticipantPatch,
    ) -> Option<Patched> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.get_mut(room_id)?;
        let participant = room.apply_patch(participant_id, patch)?;
        Some(Patched {
            participant,
            members: room.member_user_ids(None),
        })
    }

    async fn visit_member(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        visit: SnapshotHook<'_>,
    ) -> bool {
        let rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(room_id) else {
            return false;
        };
        match room.find_participant(participant_id) {
            Some(participant) => {
                visit(room, participant);
                true
            }
            None => false,
        }
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).cloned()
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    async fn add_chat(&self, room_id: &RoomId, entry: ChatEntry) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;
        room.add_chat(entry);
        Ok(())
    }
}
