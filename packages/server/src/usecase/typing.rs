//! UseCase: タイピング通知処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - TypingUseCase の start / stop / 期限切れ / 強制停止
//! - デバウンス（再 start でブロードキャストせずタイマーだけ延長）
//!
//! ### なぜこのテストが必要か
//! - typing_start が idle → typing のエッジでのみ配信されることを保証
//! - 期限切れと明示的 stop のどちらでも stop がちょうど 1 回配信されることを確認
//! - 切断したクライアントが「入力中」のまま残らないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：start → 自動期限切れ、start → 明示的 stop
//! - エッジケース：デバウンス中の古いタイマー発火、idle 中の stop
//! - 異常系：存在しない宛先への start
//!
//! タイマーのテストは tokio の test-util（時刻停止と自動進行）を使う。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::domain::{
    Destination, MessagePusher, TypingStart, TypingStop, TypingTable, UserId,
};

use super::error::TypingError;
use super::fanout::{FanoutResolver, RecipientFilter};

/// タイピング状態の自動停止までの時間（クライアント無活動の上限）
pub const DEFAULT_TYPING_TTL: Duration = Duration::from_secs(1);

/// タイピング通知のユースケース
///
/// タイピングテーブルはこのユースケースが排他的に所有する。
/// 期限切れはエポック番号の照合で判定するため、デバウンスで張り直した
/// 後の古いタイマーはキャンセルせずに放置してよい。
pub struct TypingUseCase {
    /// 宛先リゾルバ（メンバーシップ解決）
    fanout: Arc<FanoutResolver>,
    /// MessagePusher（メッセージ送出の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// タイピング状態テーブル
    table: Arc<Mutex<TypingTable>>,
    /// 自動停止までの時間
    ttl: Duration,
}

impl TypingUseCase {
    /// 新しい TypingUseCase を作成
    pub fn new(
        fanout: Arc<FanoutResolver>,
        message_pusher: Arc<dyn MessagePusher>,
        ttl: Duration,
    ) -> Self {
        Self {
            fanout,
            message_pusher,
            table: Arc::new(Mutex::new(TypingTable::new())),
            ttl,
        }
    }

    /// typing_start を処理する
    ///
    /// idle → typing のエッジでのみ `start_message` を配信し、
    /// どちらの場合も期限タイマーを張り直す。
    ///
    /// # Arguments
    ///
    /// * `user` - 入力中のユーザー
    /// * `destination` - 宛先
    /// * `start_message` - typing_start の配信用 JSON
    /// * `stop_message` - 期限切れ時に配信する typing_stop の JSON
    pub async fn start(
        &self,
        user: UserId,
        destination: Destination,
        start_message: &str,
        stop_message: String,
    ) -> Result<(), TypingError> {
        // 宛先検証と配信先解決を状態遷移より先に行う
        // （存在しない宛先では状態もタイマーも作らない）
        let targets = self
            .fanout
            .resolve(&destination, RecipientFilter::ExcludeUser(user))
            .await?;

        let outcome = {
            let mut table = self.table.lock().await;
            table.start(user, destination.clone())
        };

        if let TypingStart::Started { .. } = outcome {
            if let Err(e) = self.message_pusher.broadcast(targets, start_message).await {
                tracing::warn!("Failed to broadcast typing_start: {}", e);
            }
        }

        self.arm_expiry(user, destination, outcome.epoch(), stop_message);
        Ok(())
    }

    /// typing_stop を処理する
    ///
    /// typing → idle のエッジでのみ配信する。idle 中の stop は no-op。
    pub async fn stop(
        &self,
        user: UserId,
        destination: Destination,
        stop_message: &str,
    ) -> Result<(), TypingError> {
        let outcome = {
            let mut table = self.table.lock().await;
            table.stop(&user, &destination)
        };

        if outcome == TypingStop::Stopped {
            let targets = self
                .fanout
                .resolve(&destination, RecipientFilter::ExcludeUser(user))
                .await?;
            if let Err(e) = self.message_pusher.broadcast(targets, stop_message).await {
                tracing::warn!("Failed to broadcast typing_stop: {}", e);
            }
        }
        Ok(())
    }

    /// ユーザーの全タイピング状態を強制停止する
    ///
    /// 最後の接続が切断されたときに呼ばれる。アクティブだった宛先ごとに
    /// `render` で生成した typing_stop を配信する。
    pub async fn force_stop_all<F>(&self, user: UserId, render: F)
    where
        F: Fn(&Destination) -> String,
    {
        let destinations = {
            let mut table = self.table.lock().await;
            table.drain_user(&user)
        };

        for destination in destinations {
            match self
                .fanout
                .resolve(&destination, RecipientFilter::ExcludeUser(user))
                .await
            {
                Ok(targets) => {
                    let message = render(&destination);
                    if let Err(e) = self.message_pusher.broadcast(targets, &message).await {
                        tracing::warn!("Failed to broadcast forced typing_stop: {}", e);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to resolve destination '{}' for forced typing_stop: {}",
                        destination,
                        e
                    );
                }
            }
        }
    }

    /// 期限タイマーを起動する
    ///
    /// 発火時に観測済みエポックが現在値と一致した場合のみ stop が成立する。
    fn arm_expiry(
        &self,
        user: UserId,
        destination: Destination,
        epoch: u64,
        stop_message: String,
    ) {
        let table = self.table.clone();
        let fanout = self.fanout.clone();
        let message_pusher = self.message_pusher.clone();
        let ttl = self.ttl;

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;

            let outcome = {
                let mut table = table.lock().await;
                table.expire(&user, &destination, epoch)
            };
            if outcome != TypingStop::Stopped {
                return;
            }

            match fanout
                .resolve(&destination, RecipientFilter::ExcludeUser(user))
                .await
            {
                Ok(targets) => {
                    if let Err(e) = message_pusher.broadcast(targets, &stop_message).await {
                        tracing::warn!("Failed to broadcast expired typing_stop: {}", e);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to resolve destination '{}' for expired typing_stop: {}",
                        destination,
                        e
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ChatRepository, ConnectionId, RoomId, RoomName, SessionRegistry, SharedSessionRegistry,
        UserIdentity,
    };
    use crate::infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryChatRepository,
    };
    use idobata_shared::time::FixedClock;
    use tokio::sync::mpsc;

    fn identity(id: i64, name: &str) -> UserIdentity {
        UserIdentity::new(UserId::new(id), name.to_string())
    }

    struct TestContext {
        usecase: TypingUseCase,
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
        let usecase = TypingUseCase::new(fanout, pusher.clone(), DEFAULT_TYPING_TTL);
        TestContext {
            usecase,
            repository,
            registry,
            pusher,
        }
    }

    /// alice と bob がメンバーのルームを作り、両者の接続を登録する
    async fn setup_room(
        ctx: &TestContext,
    ) -> (
        Destination,
        mpsc::UnboundedReceiver<String>, // alice の受信側
        mpsc::UnboundedReceiver<String>, // bob の受信側
    ) {
        let room = ctx
            .repository
            .create_room(RoomName::new("general".to_string()).unwrap(), UserId::new(1))
            .await
            .unwrap();
        ctx.repository
            .add_room_member(room.id, UserId::new(2))
            .await
            .unwrap();

        let alice_conn = ConnectionId::generate();
        let bob_conn = ConnectionId::generate();
        let (alice_tx, alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, bob_rx) = mpsc::unbounded_channel();
        ctx.pusher.register_connection(alice_conn, alice_tx).await;
        ctx.pusher.register_connection(bob_conn, bob_tx).await;
        {
            let mut reg = ctx.registry.lock().await;
            reg.register(identity(1, "alice"), alice_conn);
            reg.register(identity(2, "bob"), bob_conn);
        }

        (Destination::Room(room.id), alice_rx, bob_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_start_broadcasts_to_peers_only() {
        // テスト項目: typing_start が送信者以外のメンバー接続にのみ配信される
        // given (前提条件):
        let ctx = create_test_context();
        let (destination, mut alice_rx, mut bob_rx) = setup_room(&ctx).await;

        // when (操作): alice が typing_start
        ctx.usecase
            .start(UserId::new(1), destination, "start", "stop".to_string())
            .await
            .unwrap();

        // then (期待する結果): bob にだけ届く
        assert_eq!(bob_rx.recv().await, Some("start".to_string()));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_start_is_debounced_to_single_broadcast() {
        // テスト項目: 期限内の再 start では typing_start が再配信されない
        // given (前提条件):
        let ctx = create_test_context();
        let (destination, _alice_rx, mut bob_rx) = setup_room(&ctx).await;

        // when (操作): 期限内に 2 回 start
        ctx.usecase
            .start(UserId::new(1), destination.clone(), "start", "stop".to_string())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        ctx.usecase
            .start(UserId::new(1), destination, "start", "stop".to_string())
            .await
            .unwrap();

        // then (期待する結果): typing_start はちょうど 1 回
        assert_eq!(bob_rx.recv().await, Some("start".to_string()));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_broadcasts_single_stop() {
        // テスト項目: 無活動が期限を超えると typing_stop がちょうど 1 回配信される
        // given (前提条件):
        let ctx = create_test_context();
        let (destination, _alice_rx, mut bob_rx) = setup_room(&ctx).await;
        ctx.usecase
            .start(UserId::new(1), destination, "start", "stop".to_string())
            .await
            .unwrap();
        assert_eq!(bob_rx.recv().await, Some("start".to_string()));

        // when (操作): 期限を超えて待つ
        tokio::time::sleep(DEFAULT_TYPING_TTL + Duration::from_millis(100)).await;

        // then (期待する結果):
        assert_eq!(bob_rx.recv().await, Some("stop".to_string()));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_extends_expiry() {
        // テスト項目: デバウンスでタイマーが延長され、古いタイマーは no-op になる
        // given (前提条件):
        let ctx = create_test_context();
        let (destination, _alice_rx, mut bob_rx) = setup_room(&ctx).await;
        ctx.usecase
            .start(UserId::new(1), destination.clone(), "start", "stop".to_string())
            .await
            .unwrap();
        assert_eq!(bob_rx.recv().await, Some("start".to_string()));

        // when (操作): 600ms 後に再 start、最初のタイマーの期限 (1s) を跨いで待つ
        tokio::time::sleep(Duration::from_millis(600)).await;
        ctx.usecase
            .start(UserId::new(1), destination, "start", "stop".to_string())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        // then (期待する結果): t=1.2s 時点ではまだ stop は配信されない
        assert!(bob_rx.try_recv().is_err());

        // 2 本目のタイマーの期限後には stop が届く
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(bob_rx.recv().await, Some("stop".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_stop_broadcasts_once() {
        // テスト項目: 明示的な stop で配信され、その後の期限切れは no-op になる
        // given (前提条件):
        let ctx = create_test_context();
        let (destination, _alice_rx, mut bob_rx) = setup_room(&ctx).await;
        ctx.usecase
            .start(UserId::new(1), destination.clone(), "start", "stop".to_string())
            .await
            .unwrap();
        assert_eq!(bob_rx.recv().await, Some("start".to_string()));

        // when (操作): 明示的に stop し、さらに期限を跨いで待つ
        ctx.usecase
            .stop(UserId::new(1), destination.clone(), "stop")
            .await
            .unwrap();
        tokio::time::sleep(DEFAULT_TYPING_TTL + Duration::from_millis(100)).await;

        // then (期待する結果): stop はちょうど 1 回
        assert_eq!(bob_rx.recv().await, Some("stop".to_string()));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_redundant_stop_broadcasts_nothing() {
        // テスト項目: idle 中の stop が何も配信しない
        // given (前提条件):
        let ctx = create_test_context();
        let (destination, _alice_rx, mut bob_rx) = setup_room(&ctx).await;

        // when (操作):
        ctx.usecase
            .stop(UserId::new(1), destination, "stop")
            .await
            .unwrap();

        // then (期待する結果):
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_to_unknown_room_fails_without_state() {
        // テスト項目: 存在しない宛先への start がエラーになり状態を残さない
        // given (前提条件):
        let ctx = create_test_context();
        let destination = Destination::Room(RoomId::new(99));

        // when (操作):
        let result = ctx
            .usecase
            .start(UserId::new(1), destination.clone(), "start", "stop".to_string())
            .await;

        // then (期待する結果): エラーになり、期限切れ stop も発生しない
        assert_eq!(result, Err(TypingError::DestinationNotFound(destination)));
        tokio::time::sleep(DEFAULT_TYPING_TTL + Duration::from_millis(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_stop_all_broadcasts_per_destination() {
        // テスト項目: 強制停止でアクティブな全宛先に stop が配信される
        // given (前提条件): alice が 2 つのルームで typing 中
        let ctx = create_test_context();
        let (destination1, _alice_rx, mut bob_rx) = setup_room(&ctx).await;
        let room2 = ctx
            .repository
            .create_room(RoomName::new("random".to_string()).unwrap(), UserId::new(1))
            .await
            .unwrap();
        ctx.repository
            .add_room_member(room2.id, UserId::new(2))
            .await
            .unwrap();
        let destination2 = Destination::Room(room2.id);

        ctx.usecase
            .start(UserId::new(1), destination1, "start-1", "stop-1".to_string())
            .await
            .unwrap();
        ctx.usecase
            .start(UserId::new(1), destination2, "start-2", "stop-2".to_string())
            .await
            .unwrap();
        assert!(bob_rx.recv().await.is_some());
        assert!(bob_rx.recv().await.is_some());

        // when (操作): 切断扱いで強制停止
        ctx.usecase
            .force_stop_all(UserId::new(1), |d| format!("stop:{}", d))
            .await;

        // then (期待する結果): 宛先ごとに 1 回ずつ stop が届く
        let mut stops = vec![
            bob_rx.recv().await.unwrap(),
            bob_rx.recv().await.unwrap(),
        ];
        stops.sort();
        assert!(stops[0].starts_with("stop:room:"));
        assert!(stops[1].starts_with("stop:room:"));
        assert_ne!(stops[0], stops[1]);
        assert!(bob_rx.try_recv().is_err());

        // 期限切れタイマーが後から発火しても二重配信されない
        tokio::time::sleep(DEFAULT_TYPING_TTL + Duration::from_millis(100)).await;
        assert!(bob_rx.try_recv().is_err());
    }
}
