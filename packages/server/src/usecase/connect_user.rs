//! UseCase: 接続確立処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUserUseCase::execute() メソッド
//! - 認証済み接続の登録（レジストリ登録、プレゼンス遷移、スナップショット構築）
//!
//! ### なぜこのテストが必要か
//! - ビジネスロジックの検証：最初の接続でのみ user_online が配信される
//! - マルチデバイスのユーザーが二重にオンライン扱いされないことを保証
//! - スナップショットに自分自身が含まれないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の接続、2 本目の接続
//! - エッジケース：他のユーザーがいない場合（配信対象なし）

use std::sync::Arc;

use crate::domain::{
    ChatRepository, ConnectionId, MessagePusher, PusherChannel, RegisterTransition,
    SharedSessionRegistry, UserIdentity,
};

use super::error::ConnectError;

/// 接続確立の結果
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    /// レジストリで観測されたプレゼンス遷移
    pub transition: RegisterTransition,
    /// 新しい接続に送るオンラインスナップショット（自分を除く）
    pub online_snapshot: Vec<UserIdentity>,
    /// user_online の配信対象（最初の接続のときのみ非空）
    pub presence_targets: Vec<ConnectionId>,
}

/// 接続確立のユースケース
///
/// 認証は UI 層のゲートで済んでいる前提。ここでは認証済みユーザーの
/// 接続をレジストリに登録し、プレゼンス配信に必要な情報を返す。
pub struct ConnectUserUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
    /// セッションレジストリ（ユーザー ⇔ 接続）
    registry: SharedSessionRegistry,
    /// MessagePusher（メッセージ送出の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectUserUseCase {
    /// 新しい ConnectUserUseCase を作成
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        registry: SharedSessionRegistry,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            registry,
            message_pusher,
        }
    }

    /// 接続確立を実行
    ///
    /// # Arguments
    ///
    /// * `identity` - 認証ゲートを通過したユーザー
    /// * `connection_id` - 新しい接続の ID
    /// * `sender` - 接続へのメッセージ送出用チャンネル
    pub async fn execute(
        &self,
        identity: UserIdentity,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<ConnectOutcome, ConnectError> {
        // 1. ユーザーレコードを読み取りスルーで登録（サスペンドするのはここまで）
        self.repository.ensure_user(identity.clone()).await?;

        // 2. 送出チャンネルを登録
        self.message_pusher
            .register_connection(connection_id, sender)
            .await;

        // 3. レジストリへ登録し、同じロックの中で配信情報を確定する
        let mut registry = self.registry.lock().await;
        let transition = registry.register(identity.clone(), connection_id);
        let online_snapshot = registry
            .online_users()
            .into_iter()
            .filter(|u| u.id != identity.id)
            .collect();
        let presence_targets = match transition {
            RegisterTransition::CameOnline => registry.connections_except_user(&identity.id),
            RegisterTransition::AlreadyOnline => Vec::new(),
        };

        Ok(ConnectOutcome {
            transition,
            online_snapshot,
            presence_targets,
        })
    }

    /// 新しい接続にオンラインスナップショットを送る
    pub async fn send_online_snapshot(&self, connection_id: &ConnectionId, message: &str) {
        if let Err(e) = self.message_pusher.push_to(connection_id, message).await {
            tracing::warn!(
                "Failed to send online snapshot to connection '{}': {}",
                connection_id,
                e
            );
        }
    }

    /// user_online を既存の接続にブロードキャストする
    pub async fn broadcast_user_online(&self, targets: Vec<ConnectionId>, message: &str) {
        if let Err(e) = self.message_pusher.broadcast(targets, message).await {
            tracing::warn!("Failed to broadcast user_online: {}", e);
        }
    }
}
