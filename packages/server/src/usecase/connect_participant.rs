//! UseCase: ハンドシェイク（Identity の発行）
//!
//! 接続ごとに Identity を発行し、その UserId で送信チャンネルを MessagePusher に登録します。
//! 以降、この接続宛てのブロードキャストは UserId で解決されます。

use std::sync::Arc;

use crate::domain::{Identity, IdentityFactory, MessagePusher, PusherChannel};

/// ハンドシェイクのユースケース
pub struct ConnectParticipantUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectParticipantUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// Identity を発行し、接続の送信チャンネルを登録する
    ///
    /// # Arguments
    ///
    /// * `requested_name` - クライアントが希望する表示名（無効なら "Anonymous"）
    /// * `sender` - この接続への送信チャンネル
    pub async fn execute(&self, requested_name: Option<String>, sender: PusherChannel) -> Identity {
        let identity = IdentityFactory::issue(requested_name);
        self.message_pusher
            .register_client(identity.id.clone(), sender)
            .await;

        tracing::info!(
            "Issued identity '{}' ({}) with color {}",
            identity.id.as_str(),
            identity.name.as_str(),
            identity.color.as_str()
        );
        identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockMessagePusher;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_handshake_registers_issued_identity() {
        // テスト項目: 発行した Identity の UserId で送信チャンネルが登録される
        // given (前提条件):
        let (registered_tx, mut registered_rx) = mpsc::unbounded_channel();
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_register_client()
            .times(1)
            .returning(move |user_id, _sender| {
                let _ = registered_tx.send(user_id);
            });
        let usecase = ConnectParticipantUseCase::new(Arc::new(pusher));
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let identity = usecase.execute(Some("Alice".to_string()), tx).await;

        // then (期待する結果):
        assert_eq!(identity.name.as_str(), "Alice");
        assert_eq!(registered_rx.recv().await, Some(identity.id));
    }

    #[tokio::test]
    async fn test_each_handshake_issues_distinct_identity() {
        // テスト項目: 同じ名前でもハンドシェイクごとに別の Identity が発行される
        // given (前提条件):
        let mut pusher = MockMessagePusher::new();
        pusher.expect_register_client().times(2).return_const(());
        let usecase = ConnectParticipantUseCase::new(Arc::new(pusher));

        // when (操作):
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let first = usecase.execute(None, tx1).await;
        let second = usecase.execute(None, tx2).await;

        // then (期待する結果):
        assert_ne!(first.id, second.id);
        assert_eq!(first.name.as_str(), "Anonymous");
    }
}
