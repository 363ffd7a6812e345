//! WebSocket 接続向けの MessagePusher 実装
//!
//! WebSocket の受付と送信タスクの起動は UI 層（`ui/handler/websocket.rs`）が行い、
//! この実装はハンドシェイクで登録された送信チャンネルを UserId ごとに管理します。
//!
//! 送信は unbounded チャンネルへの `send` だけで完了するため、
//! 遅いクライアントがいても呼び出し元や他のクライアントへの配信は止まりません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{MessagePushError, MessagePusher, PusherChannel, UserId};

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// UserId → 送信チャンネル
    clients: Mutex<HashMap<UserId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録中のクライアント数
    pub async fn count_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, user_id: UserId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Client '{}' registered to MessagePusher", user_id.as_str());
        clients.insert(user_id, sender);
    }

    async fn unregister_client(&self, user_id: &UserId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(user_id).is_some() {
            tracing::debug!(
                "Client '{}' unregistered from MessagePusher",
                user_id.as_str()
            );
        }
    }

    async fn push_to(&self, user_id: &UserId, content: &str) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let sender = clients
            .get(user_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(user_id.as_str().to_string()))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::trace!("Pushed frame to client '{}'", user_id.as_str());
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<UserId>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                // 送信に失敗した（切断済みの）クライアントはスキップし、他への配信を続ける
                Some(sender) => {
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::warn!(
                            "Failed to push frame to client '{}': {}",
                            target.as_str(),
                            e
                        );
                    }
                }
                None => {
                    tracing::debug!(
                        "Client '{}' not found during broadcast, skipping",
                        target.as_str()
                    );
                }
            }
        }

        Ok(())
    }
}
