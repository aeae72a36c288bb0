//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectUserUseCase::execute() メソッド
//! - 接続の登録解除（レジストリ削除、プレゼンス遷移、通知対象選定）
//!
//! ### なぜこのテストが必要か
//! - ビジネスロジックの検証：最後の接続が閉じたときのみ user_offline が配信される
//! - レジストリ不変条件（キー存在 ⇔ 接続セット非空）の回復を保証
//! - 未登録の接続の切断が安全に no-op になることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：最後の接続の切断、残り接続がある切断
//! - エッジケース：未登録の接続の切断

use std::sync::Arc;

use crate::domain::{
    ConnectionId, DeregisterTransition, MessagePusher, SharedSessionRegistry, UserIdentity,
};

/// 切断処理の結果
#[derive(Debug, Clone)]
pub struct DisconnectOutcome {
    /// 接続を所有していたユーザー
    pub identity: UserIdentity,
    /// レジストリで観測されたプレゼンス遷移
    pub transition: DeregisterTransition,
    /// user_offline の配信対象（オフライン遷移のときのみ非空）
    pub offline_targets: Vec<ConnectionId>,
}

/// 切断のユースケース
///
/// 切断は任意のタイミングで起こるキャンセルシグナルであり、
/// レジストリからの削除とプレゼンス再評価はベストエフォートではなく
/// 切断契約の一部として必ず実行される。
pub struct DisconnectUserUseCase {
    /// セッションレジストリ（ユーザー ⇔ 接続）
    registry: SharedSessionRegistry,
    /// MessagePusher（メッセージ送出の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectUserUseCase {
    /// 新しい DisconnectUserUseCase を作成
    pub fn new(registry: SharedSessionRegistry, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            registry,
            message_pusher,
        }
    }

    /// 切断処理を実行
    ///
    /// # Returns
    ///
    /// * `Some(DisconnectOutcome)` - 登録済みの接続の切断
    /// * `None` - 未登録の接続（冪等に無視）
    pub async fn execute(&self, connection_id: ConnectionId) -> Option<DisconnectOutcome> {
        // 1. 送出チャンネルを解除（以後この接続へは配信されない）
        self.message_pusher
            .unregister_connection(&connection_id)
            .await;

        // 2. レジストリから削除し、同じロックの中で配信対象を確定する
        let mut registry = self.registry.lock().await;
        let deregistration = registry.deregister(&connection_id)?;
        let offline_targets = match deregistration.transition {
            DeregisterTransition::WentOffline => registry.all_connections(),
            DeregisterTransition::StillOnline => Vec::new(),
        };

        Some(DisconnectOutcome {
            identity: deregistration.identity,
            transition: deregistration.transition,
            offline_targets,
        })
    }

    /// user_offline を残りの接続にブロードキャストする
    pub async fn broadcast_user_offline(&self, targets: Vec<ConnectionId>, message: &str) {
        if let Err(e) = self.message_pusher.broadcast(targets, message).await {
            tracing::warn!("Failed to broadcast user_offline: {}", e);
        }
    }
}
