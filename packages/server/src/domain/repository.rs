//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 永続化の責務分担
//!
//! ユーザー・ルーム・会話・メッセージの永続レコードはストレージ
//! コラボレータが所有する。コーディネータ側はファンアウト解決のために
//! メンバーシップを読み取るだけで、スキーマの詳細には関知しない。
//! メッセージ ID と作成時刻は永続化時にストレージが採番する。

use async_trait::async_trait;

use super::entity::{Conversation, Message, MessageStatus, Room, UserIdentity};
use super::value_object::{Destination, MessageContent, MessageId, RoomId, RoomName, UserId};

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Chat Repository trait
///
/// ドメイン層が必要とするデータストアへのインターフェース。
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// ユーザーレコードを登録・更新する（冪等）
    ///
    /// 認証済み接続の確立時に呼ばれ、表示名は最新の値で上書きされる。
    async fn ensure_user(&self, identity: UserIdentity) -> Result<(), RepositoryError>;

    /// 既知の全ユーザーを取得
    async fn list_users(&self) -> Result<Vec<UserIdentity>, RepositoryError>;

    /// ルームを作成する（ID はストレージが採番、オーナーは自動的にメンバー）
    async fn create_room(&self, name: RoomName, owner: UserId) -> Result<Room, RepositoryError>;

    /// 全ルームを取得
    async fn list_rooms(&self) -> Result<Vec<Room>, RepositoryError>;

    /// ルームにメンバーを追加する（冪等）
    ///
    /// ルームが存在しない場合は `RoomNotFound`
    async fn add_room_member(&self, room_id: RoomId, user: UserId) -> Result<(), RepositoryError>;

    /// ルームからメンバーを削除する（冪等）
    async fn remove_room_member(
        &self,
        room_id: RoomId,
        user: UserId,
    ) -> Result<(), RepositoryError>;

    /// 2 ユーザー間の会話を解決する（存在しなければ作成）
    ///
    /// 引数の順序に依存せず同一の会話が返る。
    async fn resolve_or_create_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Conversation, RepositoryError>;

    /// 宛先のメンバーを取得
    ///
    /// ルームはメンバーセット、会話は参加者 2 人。
    async fn members_of(&self, destination: Destination) -> Result<Vec<UserId>, RepositoryError>;

    /// メッセージを永続化し、採番済みのメッセージを返す
    ///
    /// 宛先が会話の場合、会話レコードは必要に応じて遅延作成される。
    async fn append_message(
        &self,
        sender: UserIdentity,
        destination: Destination,
        content: MessageContent,
    ) -> Result<Message, RepositoryError>;

    /// 宛先のメッセージ履歴を永続化順で取得
    async fn list_messages(
        &self,
        destination: Destination,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// メッセージステータスを前方遷移で更新する
    ///
    /// 後退方向の遷移は no-op（現在値を維持）。
    async fn advance_message_status(
        &self,
        message_id: MessageId,
        to: MessageStatus,
    ) -> Result<(), RepositoryError>;
}
