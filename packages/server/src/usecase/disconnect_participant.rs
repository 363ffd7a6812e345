//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 送信チャンネルの登録解除と、所属 Room からの退室
//!
//! ### なぜこのテストが必要か
//! - 切断後に閉じた接続へ送信が試みられないことを保証する
//! - 切断した参加者が名簿に残り続けないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：Room に所属したままの切断
//! - エッジケース：入室前の切断、既に退室済みの参加者の切断

use std::sync::Arc;

use crate::domain::{
    Membership, MessagePushError, MessagePusher, Removal, RoomRepository, UserId,
};

use super::leave_room::remaining_members;

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 切断を実行
    ///
    /// # Arguments
    ///
    /// * `user_id` - ハンドシェイク済みの接続の UserId（未ハンドシェイクなら `None`）
    /// * `membership` - 切断時に所属していた Room
    ///
    /// # Returns
    ///
    /// 退室が発生した場合はその結果（通知対象の算出に使う）
    pub async fn execute(
        &self,
        user_id: Option<&UserId>,
        membership: Option<&Membership>,
    ) -> Option<Removal> {
        if let Some(user_id) = user_id {
            self.message_pusher.unregister_client(user_id).await;
        }

        let membership = membership?;
        let removal = self
            .repository
            .remove(&membership.room_id, &membership.participant_id)
            .await;
        if removal.is_some() {
            tracing::info!(
                "'{}' removed from room '{}' on disconnect",
                membership.participant_id.as_str(),
                membership.room_id.as_str()
            );
        }
        removal
    }

    /// 切断を残りのメンバーにブロードキャスト
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
