//! UseCase: 入室
//!
//! 未知の RoomId への入室は Room を作成し、入室者がオーナーになります。
//! Room の設定は作成時にだけ反映され、既存 Room への入室では無視されます。
//!
//! 入室者宛てのスナップショットは Repository の排他区間の中で送信キューに
//! 積まれるため、他の参加者の変更通知がスナップショットを追い越すことはありません。

use std::sync::Arc;

use crate::domain::{
    Admission, Identity, Membership, MessagePushError, MessagePusher, RoomId, RoomRepository,
    RoomSettings, SnapshotHook, Timestamp,
};

use super::error::JoinError;

/// 入室のユースケース
pub struct JoinRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl JoinRoomUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// Room に入室する
    ///
    /// `on_admitted` は入室が確定した排他区間の中で呼ばれる。
    ///
    /// # Returns
    ///
    /// * `Ok(Admission)` - 割り当てられた参加者と入室後の Room
    /// * `Err(JoinError)` - RoomId が不正、または Room が満員
    pub async fn execute(
        &self,
        identity: &Identity,
        room_id: String,
        settings: Option<RoomSettings>,
        joined_at: Timestamp,
        on_admitted: SnapshotHook<'_>,
    ) -> Result<Admission, JoinError> {
        let room_id = RoomId::new(room_id).map_err(JoinError::InvalidRoomId)?;
        let admission = self
            .repository
            .admit_with_snapshot(identity, &room_id, settings, joined_at, on_admitted)
            .await?;

        tracing::info!(
            "'{}' joined room '{}' as '{}'{}",
            identity.name.as_str(),
            room_id.as_str(),
            admission.participant.id.as_str(),
            if admission.created { " (created)" } else { "" }
        );
        Ok(admission)
    }

    /// 既に所属している Room のスナップショットを `resend` に渡す
    ///
    /// 参加者が既に Room にいない場合は `false`。
    pub async fn resend_snapshot(&self, membership: &Membership, resend: SnapshotHook<'_>) -> bool {
        self.repository
            .visit_member(&membership.room_id, &membership.participant_id, resend)
            .await
    }

    /// 入室を他の参加者にブロードキャスト
    pub async fn broadcast_joined(
        &self,
        admission: &Admission,
        message: &str,
    ) -> Result<(), MessagePushError> {
        let targets = admission
            .room
            .member_user_ids(Some(&admission.participant.id));
        self.message_pusher.broadcast(targets, message).await
    }
}
