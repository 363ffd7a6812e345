//! UseCase: チャット送信
//!
//! チャットは送信者を含む Room の全メンバーに配信され、Room ごとに
//! 上限付きの履歴として保持されます（永続化はしない）。

use std::sync::Arc;

use crate::domain::{
    ChatEntry, ChatText, Membership, MessagePushError, MessagePusher, RoomRepository, Timestamp,
    UserId,
};

use super::error::{ProtocolViolation, SendChatError};

/// 受理されたチャット
#[derive(Debug, Clone, PartialEq)]
pub struct ChatDelivery {
    pub text: ChatText,
    /// 通知対象（送信者を含む）
    pub targets: Vec<UserId>,
}

/// チャット送信のユースケース
pub struct SendChatUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl SendChatUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// チャットを送信する
    ///
    /// 送信者が既に Room にいない場合は `Ok(None)`（no-op）。
    pub async fn execute(
        &self,
        membership: &Membership,
        text: String,
        sent_at: Timestamp,
    ) -> Result<Option<ChatDelivery>, SendChatError> {
        let text = ChatText::new(text)?;

        let Some(room) = self.repository.get_room(&membership.room_id).await else {
            return Ok(None);
        };
        if !room.contains(&membership.participant_id) {
            return Ok(None);
        }
        if !room.settings.chat_enabled {
            return Err(ProtocolViolation::ChatDisabled.into());
        }

        let entry = ChatEntry {
            author: membership.participant_id.clone(),
            text: text.clone(),
            sent_at,
        };
        if let Err(e) = self.repository.add_chat(&membership.room_id, entry).await {
            tracing::debug!("Chat dropped: {}", e);
            return Ok(None);
        }

        Ok(Some(ChatDelivery {
            text,
            targets: room.member_user_ids(None),
        }))
    }

    pub async fn broadcast(
        &self,
        targets: Vec<UserId>,
        message: &str,
    ) -> Result<(), MessagePushError> {
        self.message_pusher.broadcast(targets, message).await
    }
}
