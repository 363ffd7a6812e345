//! UseCase: Room 一覧・詳細の取得（HTTP API 用）

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{Room, RoomId, RoomRepository};

/// Room 一覧取得のユースケース
pub struct GetRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// 公開（visible）設定の Room だけを RoomId 順に返す
    pub async fn execute(&self) -> Vec<Room> {
        self.repository
            .list_rooms()
            .await
            .into_iter()
            .filter(|room| room.settings.visible)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("room not found")]
    RoomNotFound,
}

/// Room 詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, room_id: String) -> Result<Room, GetRoomDetailError> {
        let room_id = RoomId::new(room_id).map_err(|_| GetRoomDetailError::RoomNotFound)?;
        self.repository
            .get_room(&room_id)
            .await
            .ok_or(GetRoomDetailError::RoomNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ServerConfig,
        domain::{Color, DisplayName, Identity, RoomSettings, Timestamp, UserId},
        infrastructure::repository::InMemoryRoomRepository,
    };

    async fn repository() -> Arc<InMemoryRoomRepository> {
        let repository = Arc::new(InMemoryRoomRepository::new(&ServerConfig::default()));
        let identity = Identity {
            id: UserId::new("A".to_string()).unwrap(),
            name: DisplayName::new("A".to_string()).unwrap(),
            color: Color::new("#000".to_string()).unwrap(),
        };
        for (room, visible) in [("public", true), ("secret", false)] {
            repository
                .admit(
                    &identity,
                    &RoomId::new(room.to_string()).unwrap(),
                    Some(RoomSettings {
                        visible,
                        ..RoomSettings::default()
                    }),
                    Timestamp::new(1),
                )
                .await
                .unwrap();
        }
        repository
    }

    #[tokio::test]
    async fn test_list_excludes_hidden_rooms() {
        // テスト項目: 一覧には visible な Room だけが含まれる
        // given (前提条件):
        let usecase = GetRoomsUseCase::new(repository().await);

        // when (操作):
        let rooms = usecase.execute().await;

        // then (期待する結果):
        let ids: Vec<&str> = rooms.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["public"]);
    }

    #[tokio::test]
    async fn test_detail_of_hidden_room_by_id() {
        // テスト項目: 非公開の Room も ID を指定すれば取得できる
        // given (前提条件):
        let usecase = GetRoomDetailUseCase::new(repository().await);

        // when (操作):
        let room = usecase.execute("secret".to_string()).await.unwrap();

        // then (期待する結果):
        assert_eq!(room.participants.len(), 1);
    }

    #[tokio::test]
    async fn test_detail_of_unknown_room_fails() {
        // テスト項目: 存在しない Room は RoomNotFound になる
        // given (前提条件):
        let usecase = GetRoomDetailUseCase::new(repository().await);

        // when (操作):
        let result = usecase.execute("nowhere".to_string()).await;

        // then (期待する結果):
        assert_eq!(result, Err(GetRoomDetailError::RoomNotFound));
    }
}
