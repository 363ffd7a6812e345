//! UseCase: プレゼンス（名前・色・カーソル位置）の更新
//!
//! パッチは疎に適用され、含まれないフィールドは変更されません。
//! 適用後のパッチは送信者を含む Room の全メンバーに配信されます。
//! 通知先はパッチの適用と同じ排他区間で確定します。

use std::sync::Arc;

use crate::domain::{
    Membership, MessagePushError, MessagePusher, Participant, ParticipantPatch, RoomRepository,
    UserId,
};

/// 適用されたプレゼンス変更
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceChange {
    pub participant: Participant,
    /// 通知対象（送信者を含む）
    pub targets: Vec<UserId>,
}

/// プレゼンス更新のユースケース
pub struct UpdatePresenceUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl UpdatePresenceUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// パッチを適用する
    ///
    /// 空のパッチ、または既に Room にいない参加者へのパッチは `None`（no-op）。
    pub async fn execute(
        &self,
        membership: &Membership,
        patch: &ParticipantPatch,
    ) -> Option<PresenceChange> {
        if patch.is_empty() {
            return None;
        }

        let Some(patched) = self
            .repository
            .update(&membership.room_id, &membership.participant_id, patch)
            .await
        else {
            tracing::debug!(
                "Ignoring presence update for stale participant '{}'",
                membership.participant_id.as_str()
            );
            return None;
        };

        Some(PresenceChange {
            participant: patched.participant,
            targets: patched.members,
        })
    }

    pub async fn broadcast(
        &self,
        targets: Vec<UserId>,
        message: &str,
    ) -> Result<(), MessagePushError> {
        self.message_pusher.broadcast(targets, message).await
    }
}
