//! UseCase: 退室（Room の切り替え時）

use std::sync::Arc;

use crate::domain::{
    Membership, MessagePushError, MessagePusher, Removal, RoomRepository, UserId,
};

/// 退室のユースケース
pub struct LeaveRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl LeaveRoomUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// Room から退室する
    ///
    /// 既に Room にいない場合は `None`（no-op）。
    pub async fn execute(&self, membership: &Membership) -> Option<Removal> {
        let removal = self
            .repository
            .remove(&membership.room_id, &membership.participant_id)
            .await;

        match &removal {
            Some(removal) => {
                tracing::info!(
                    "'{}' left room '{}'",
                    membership.participant_id.as_str(),
                    membership.room_id.as_str()
                );
                if let Some(owner) = &removal.departure.new_owner {
                    tracing::info!(
                        "'{}' is now the owner of room '{}'",
                        owner.as_str(),
                        membership.room_id.as_str()
                    );
                }
            }
            None => tracing::debug!(
                "'{}' was no longer in room '{}'",
                membership.participant_id.as_str(),
                membership.room_id.as_str()
            ),
        }
        removal
    }

    /// 退室を残りのメンバーにブロードキャスト
    pub async fn broadcast_left(
        &self,
        removal: &Removal,
        message: &str,
    ) -> Result<(), MessagePushError> {
        self.message_pusher
            .broadcast(remaining_members(removal), message)
            .await
    }
}

/// 退室後に Room に残っているメンバーの送信先
pub fn remaining_members(removal: &Removal) -> Vec<UserId> {
    removal
        .room
        .as_ref()
        .map(|room| room.member_user_ids(None))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ServerConfig,
        domain::{
            Color, DisplayName, Identity, MockMessagePusher, ParticipantId, RoomId, Timestamp,
        },
        infrastructure::repository::InMemoryRoomRepository,
    };

    fn identity(id: &str) -> Identity {
        Identity {
            id: UserId::new(id.to_string()).unwrap(),
            name: DisplayName::new(id.to_string()).unwrap(),
            color: Color::new("#aabbcc".to_string()).unwrap(),
        }
    }

    fn membership(room: &str, participant: &str) -> Membership {
        Membership {
            room_id: RoomId::new(room.to_string()).unwrap(),
            participant_id: ParticipantId::new(participant.to_string()).unwrap(),
        }
    }

    async fn repository_with(users: &[&str]) -> Arc<InMemoryRoomRepository> {
        let repository = Arc::new(InMemoryRoomRepository::new(&ServerConfig::default()));
        let room_id = RoomId::new("lobby".to_string()).unwrap();
        for (i, user) in users.iter().enumerate() {
            repository
                .admit(&identity(user), &room_id, None, Timestamp::new(i as i64))
                .await
                .unwrap();
        }
        repository
    }

    #[tokio::test]
    async fn test_owner_leaving_promotes_next_and_notifies_remaining() {
        // テスト項目: オーナーの退室で次の参加者がオーナーになり、残りのメンバーに通知される
        // given (前提条件):
        let repository = repository_with(&["A", "B", "C"]).await;
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_broadcast()
            .withf(|targets, _| {
                targets
                    == &vec![
                        UserId::new("B".to_string()).unwrap(),
                        UserId::new("C".to_string()).unwrap(),
                    ]
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let usecase = LeaveRoomUseCase::new(repository, Arc::new(pusher));

        // when (操作):
        let removal = usecase.execute(&membership("lobby", "A")).await.unwrap();
        usecase.broadcast_left(&removal, "left").await.unwrap();

        // then (期待する結果):
        assert_eq!(
            removal.departure.new_owner,
            Some(ParticipantId::new("B".to_string()).unwrap())
        );
    }

    #[tokio::test]
    async fn test_leave_twice_is_noop() {
        // テスト項目: 既に退室した参加者の退室は None（no-op）
        // given (前提条件):
        let repository = repository_with(&["A", "B"]).await;
        let usecase = LeaveRoomUseCase::new(repository, Arc::new(MockMessagePusher::new()));
        usecase.execute(&membership("lobby", "B")).await.unwrap();

        // when (操作):
        let second = usecase.execute(&membership("lobby", "B")).await;

        // then (期待する結果):
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_last_member_leaving_has_no_one_to_notify() {
        // テスト項目: 最後のメンバーが退室した場合、通知先は空になる
        // given (前提条件):
        let repository = repository_with(&["A"]).await;
        let usecase = LeaveRoomUseCase::new(repository, Arc::new(MockMessagePusher::new()));

        // when (操作):
        let removal = usecase.execute(&membership("lobby", "A")).await.unwrap();

        // then (期待する結果):
        assert!(remaining_members(&removal).is_empty());
        assert_eq!(removal.room, None);
    }
}
