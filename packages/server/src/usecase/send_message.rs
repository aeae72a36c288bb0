//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - メッセージ送信処理（宛先検証、永続化、ファンアウト）
//!
//! ### なぜこのテストが必要か
//! - 「永続化してから配信」の不変条件を保証（永続化失敗時は誰にも配信されない）
//! - 送信者自身の接続を含む全メンバー接続への配信を確認
//! - 存在しない宛先への送信が発信元だけのエラーになることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム宛・会話宛の送信とファンアウト
//! - 異常系：存在しないルーム、ストレージ障害
//! - エッジケース：オフラインメンバー（配信されないが履歴には残る）

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    ChatRepository, Destination, Message, MessageContent, MessagePusher, UserIdentity,
};

use super::error::SendMessageError;
use super::fanout::{FanoutResolver, RecipientFilter};

/// 宛先単位の配信ロック
///
/// 永続化から配信までを宛先ごとに直列化することで、同一宛先への
/// 並行送信が永続化順と異なる順序で配信されることを防ぐ。
/// 宛先をまたぐ送信同士は並行に進行できる。
#[derive(Default)]
struct DeliveryLocks {
    inner: Mutex<HashMap<Destination, Arc<Mutex<()>>>>,
}

impl DeliveryLocks {
    async fn acquire(&self, destination: &Destination) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks
                .entry(destination.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
    /// 宛先リゾルバ（メンバーシップ解決）
    fanout: Arc<FanoutResolver>,
    /// MessagePusher（メッセージ送出の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// 宛先単位の配信ロック
    delivery_locks: DeliveryLocks,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        fanout: Arc<FanoutResolver>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            fanout,
            message_pusher,
            delivery_locks: DeliveryLocks::default(),
        }
    }

    /// メッセージ送信を実行
    ///
    /// 検証 → 永続化 → 配信の順で処理する。永続化が失敗した場合は
    /// 何も配信されない。配信は送信者自身の接続も含む全メンバー接続に
    /// 対して行われ、発信元の接続に届くエコーが送達確認を兼ねる。
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信者（認証済み）
    /// * `destination` - 宛先（ルーム / 会話）
    /// * `content` - メッセージ本文（検証済みの Domain Model）
    /// * `render` - 採番済みメッセージを配信用 JSON に変換するクロージャ
    pub async fn execute<F>(
        &self,
        sender: UserIdentity,
        destination: Destination,
        content: MessageContent,
        render: F,
    ) -> Result<Message, SendMessageError>
    where
        F: FnOnce(&Message) -> String,
    {
        // 宛先単位の順序保証: 永続化と配信を 1 つのクリティカルセクションにする
        let _guard = self.delivery_locks.acquire(&destination).await;

        // 1. 宛先を検証し、メンバーを解決する
        let members = self.fanout.members_of(&destination).await?;

        // 2. 永続化（ID と作成時刻はストレージが採番する）
        let message = self
            .repository
            .append_message(sender, destination, content)
            .await
            .map_err(SendMessageError::Persistence)?;

        // 3. 配信（送信者自身の接続を含む、同一接続への二重送信なし）
        let targets = self
            .fanout
            .connections_for(&members, RecipientFilter::AllMembers)
            .await;
        let payload = render(&message);
        if let Err(e) = self.message_pusher.broadcast(targets, &payload).await {
            // メッセージは永続化済みのため、配信失敗はリクエスト失敗にしない
            tracing::warn!("Failed to broadcast message {}: {}", message.id, e);
        }

        Ok(message)
    }
}
