//! UseCase: 既読通知処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MarkSeenUseCase::execute() メソッド
//! - 既読レシートの配信とステータスの前方遷移
//!
//! ### なぜこのテストが必要か
//! - レシートが既読者以外のメンバーにのみ配信されることを保証
//! - 既に Seen のメッセージへのレシートが no-op（エラーではない）であることを確認
//! - ステータス永続化がベストエフォートであり、配信を妨げないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム・会話での既読レシート
//! - エッジケース：既読済みメッセージへの再レシート
//! - 異常系：存在しない宛先

use std::sync::Arc;

use crate::domain::{
    ChatRepository, Destination, MessageId, MessagePusher, MessageStatus, UserId,
};

use super::error::SeenError;
use super::fanout::{FanoutResolver, RecipientFilter};

/// 既読通知のユースケース
///
/// UI 向けの保証は配信であり、ステータスの永続化は利便のための
/// ベストエフォートに留める（失敗してもリクエストは成功する）。
pub struct MarkSeenUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
    /// 宛先リゾルバ（メンバーシップ解決）
    fanout: Arc<FanoutResolver>,
    /// MessagePusher（メッセージ送出の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl MarkSeenUseCase {
    /// 新しい MarkSeenUseCase を作成
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        fanout: Arc<FanoutResolver>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            fanout,
            message_pusher,
        }
    }

    /// 既読通知を実行
    ///
    /// # Arguments
    ///
    /// * `seen_by` - 既読にしたユーザー
    /// * `message_id` - 対象メッセージ
    /// * `destination` - メッセージの宛先
    /// * `seen_message` - message_seen の配信用 JSON
    pub async fn execute(
        &self,
        seen_by: UserId,
        message_id: MessageId,
        destination: Destination,
        seen_message: &str,
    ) -> Result<(), SeenError> {
        // 1. 宛先を検証し、既読者以外の接続を解決する
        let targets = self
            .fanout
            .resolve(&destination, RecipientFilter::ExcludeUser(seen_by))
            .await?;

        // 2. ステータスを前方遷移で更新（ベストエフォート）
        if let Err(e) = self
            .repository
            .advance_message_status(message_id, MessageStatus::Seen)
            .await
        {
            tracing::warn!(
                "Failed to persist seen status for message {}: {}",
                message_id,
                e
            );
        }

        // 3. レシートを配信
        if let Err(e) = self.message_pusher.broadcast(targets, seen_message).await {
            tracing::warn!("Failed to broadcast message_seen: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConnectionId, MessageContent, RoomId, RoomName, SessionRegistry, SharedSessionRegistry,
        UserIdentity,
    };
    use crate::infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryChatRepository,
    };
    use idobata_shared::time::FixedClock;
    use tokio::sync::{Mutex, mpsc};

    fn identity(id: i64, name: &str) -> UserIdentity {
        UserIdentity::new(UserId::new(id), name.to_string())
    }

    struct TestContext {
        usecase: MarkSeenUseCase,
        repository: Arc<InMemoryChatRepository>,
        registry: SharedSessionRegistry,
        pusher: Arc<WebSocketMessagePusher>,
    }

    fn create_test_context() -> TestContext {
        let repository = Arc::new(InMemoryChatRepository::new(Arc::new(FixedClock::new(
            1700000000000,
        ))));
        let registry: SharedSessionRegistry = Arc::new(Mutex::new(SessionRegistry::new()));
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let fanout = Arc::new(FanoutResolver::new(repository.clone(), registry.clone()));
        let usecase = MarkSeenUseCase::new(repository.clone(), fanout, pusher.clone());
        TestContext {
            usecase,
            repository,
            registry,
            pusher,
        }
    }

    async fn connect(
        ctx: &TestContext,
        user: UserIdentity,
    ) -> mpsc::UnboundedReceiver<String> {
        let conn = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        ctx.pusher.register_connection(conn, tx).await;
        ctx.registry.lock().await.register(user, conn);
        rx
    }

    #[tokio::test]
    async fn test_seen_receipt_is_broadcast_to_other_members() {
        // テスト項目: レシートが既読者以外のメンバーに配信され、ステータスが進む
        // given (前提条件): alice のメッセージを bob が既読にする
        let ctx = create_test_context();
        let room = ctx
            .repository
            .create_room(RoomName::new("general".to_string()).unwrap(), UserId::new(1))
            .await
            .unwrap();
        ctx.repository
            .add_room_member(room.id, UserId::new(2))
            .await
            .unwrap();
        let message = ctx
            .repository
            .append_message(
                identity(1, "alice"),
                Destination::Room(room.id),
                MessageContent::new("hi".to_string()).unwrap(),
            )
            .await
            .unwrap();

        let mut alice_rx = connect(&ctx, identity(1, "alice")).await;
        let mut bob_rx = connect(&ctx, identity(2, "bob")).await;

        // when (操作):
        ctx.usecase
            .execute(
                UserId::new(2),
                message.id,
                Destination::Room(room.id),
                "seen",
            )
            .await
            .unwrap();

        // then (期待する結果): alice に届き、bob 自身には届かない
        assert_eq!(alice_rx.recv().await, Some("seen".to_string()));
        assert!(bob_rx.try_recv().is_err());

        let history = ctx
            .repository
            .list_messages(Destination::Room(room.id))
            .await
            .unwrap();
        assert_eq!(history[0].status, MessageStatus::Seen);
    }

    #[tokio::test]
    async fn test_receipt_for_already_seen_message_still_broadcasts() {
        // テスト項目: 既読済みメッセージへのレシートもエラーにならず配信される
        // given (前提条件): メッセージは既に Seen
        let ctx = create_test_context();
        let room = ctx
            .repository
            .create_room(RoomName::new("general".to_string()).unwrap(), UserId::new(1))
            .await
            .unwrap();
        ctx.repository
            .add_room_member(room.id, UserId::new(2))
            .await
            .unwrap();
        ctx.repository
            .add_room_member(room.id, UserId::new(3))
            .await
            .unwrap();
        let message = ctx
            .repository
            .append_message(
                identity(1, "alice"),
                Destination::Room(room.id),
                MessageContent::new("hi".to_string()).unwrap(),
            )
            .await
            .unwrap();
        ctx.repository
            .advance_message_status(message.id, MessageStatus::Seen)
            .await
            .unwrap();

        let mut alice_rx = connect(&ctx, identity(1, "alice")).await;

        // when (操作): charlie もレシートを送る
        let result = ctx
            .usecase
            .execute(
                UserId::new(3),
                message.id,
                Destination::Room(room.id),
                "seen-by-charlie",
            )
            .await;

        // then (期待する結果): 成功し、レシートは配信され、ステータスは Seen のまま
        assert!(result.is_ok());
        assert_eq!(alice_rx.recv().await, Some("seen-by-charlie".to_string()));
        let history = ctx
            .repository
            .list_messages(Destination::Room(room.id))
            .await
            .unwrap();
        assert_eq!(history[0].status, MessageStatus::Seen);
    }

    #[tokio::test]
    async fn test_unknown_destination_fails_without_broadcast() {
        // テスト項目: 存在しない宛先へのレシートがエラーになる
        // given (前提条件):
        let ctx = create_test_context();
        let mut alice_rx = connect(&ctx, identity(1, "alice")).await;
        let destination = Destination::Room(RoomId::new(99));

        // when (操作):
        let result = ctx
            .usecase
            .execute(UserId::new(2), MessageId::new(1), destination.clone(), "seen")
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SeenError::DestinationNotFound(destination)));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_status_persistence_is_best_effort() {
        // テスト項目: 存在しないメッセージ ID でも配信は行われる
        // given (前提条件):
        let ctx = create_test_context();
        let room = ctx
            .repository
            .create_room(RoomName::new("general".to_string()).unwrap(), UserId::new(1))
            .await
            .unwrap();
        ctx.repository
            .add_room_member(room.id, UserId::new(2))
            .await
            .unwrap();
        let mut alice_rx = connect(&ctx, identity(1, "alice")).await;

        // when (操作): 履歴にないメッセージ ID でレシートを送る
        let result = ctx
            .usecase
            .execute(
                UserId::new(2),
                MessageId::new(42),
                Destination::Room(room.id),
                "seen",
            )
            .await;

        // then (期待する結果): ステータス更新失敗は配信を妨げない
        assert!(result.is_ok());
        assert_eq!(alice_rx.recv().await, Some("seen".to_string()));
    }
}
