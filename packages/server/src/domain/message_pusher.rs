//! メッセージ送信（通知）の trait 定義

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{MessagePushError, UserId};

/// 接続ごとの送信チャンネル（エンコード済みフレームを運ぶ）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// MessagePusher trait
///
/// 接続中のクライアントへフレームを届ける。遅いクライアントがいても
/// 他のクライアントへの配信や呼び出し元をブロックしてはならない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// クライアントの送信チャンネルを登録
    async fn register_client(&self, user_id: UserId, sender: PusherChannel);

    /// クライアントの送信チャンネルを登録解除
    async fn unregister_client(&self, user_id: &UserId);

    /// 特定のクライアントに送信
    async fn push_to(&self, user_id: &UserId, content: &str) -> Result<(), MessagePushError>;

    /// 複数のクライアントに送信（一部の失敗は許容する）
    async fn broadcast(&self, targets: Vec<UserId>, content: &str)
    -> Result<(), MessagePushError>;
}
