//! UseCase: 入力バッチの中継
//!
//! crownsolo が有効な Room では、オーナー以外からの入力を中継しません。

use std::sync::Arc;

use crate::domain::{Membership, MessagePushError, MessagePusher, RoomRepository, UserId};

use super::error::ProtocolViolation;

/// 入力中継のユースケース
pub struct RelayInputUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelayInputUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 中継先を決定する
    ///
    /// # Returns
    ///
    /// * `Ok(Some(targets))` - 送信者以外のメンバー
    /// * `Ok(None)` - 送信者が既に Room にいない（no-op）
    /// * `Err(ProtocolViolation::InputNotPermitted)` - crownsolo 下で送信者がオーナーでない
    pub async fn execute(
        &self,
        membership: &Membership,
    ) -> Result<Option<Vec<UserId>>, ProtocolViolation> {
        let Some(room) = self.repository.get_room(&membership.room_id).await else {
            return Ok(None);
        };
        if !room.contains(&membership.participant_id) {
            return Ok(None);
        }
        if !room.may_play(&membership.participant_id) {
            return Err(ProtocolViolation::InputNotPermitted);
        }
        Ok(Some(room.member_user_ids(Some(&membership.participant_id))))
    }

    pub async fn broadcast(
        &self,
        targets: Vec<UserId>,
        message: &str,
    ) -> Result<(), MessagePushError> {
        self.message_pusher.broadcast(targets, message).await
    }
}
