//! MessagePusher trait 定義
//!
//! 接続へのメッセージ送出の抽象化。UseCase 層はこの trait を通じて
//! 配信を行い、WebSocket などの具体的なトランスポートには依存しない。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

/// 接続ごとの送信チャンネル
///
/// WebSocket の送信ループに接続された unbounded チャンネル。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// メッセージ送出のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagePushError {
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),
    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// MessagePusher trait
///
/// 接続 ID をキーとした送信チャンネルの管理とメッセージ送出。
/// broadcast は一部の接続への送信失敗を許容する（切断競合があるため）。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// 特定の接続にメッセージを送出
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続にメッセージを送出（部分失敗を許容）
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError>;
}
