//! UseCase: ディレクトリ系の参照・作成操作
//!
//! ルーム作成・一覧、メッセージ履歴、ユーザー一覧。いずれも
//! Repository の薄い前段で、HTTP API から呼ばれる。

use std::sync::Arc;

use crate::domain::{
    ChatRepository, Destination, Message, RepositoryError, Room, RoomName, UserId, UserIdentity,
};

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
}

impl CreateRoomUseCase {
    /// 新しい CreateRoomUseCase を作成
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    /// ルームを作成する（オーナーは自動的にメンバーになる）
    pub async fn execute(&self, name: RoomName, owner: UserId) -> Result<Room, RepositoryError> {
        let room = self.repository.create_room(name, owner).await?;
        tracing::info!("Room {} ('{}') created by {}", room.id, room.name.as_str(), owner);
        Ok(room)
    }
}

/// ルーム一覧取得のユースケース
pub struct ListRoomsUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
}

impl ListRoomsUseCase {
    /// 新しい ListRoomsUseCase を作成
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    /// 全ルームを取得
    pub async fn execute(&self) -> Result<Vec<Room>, RepositoryError> {
        self.repository.list_rooms().await
    }
}

/// メッセージ履歴取得のユースケース
pub struct ListMessagesUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
}

impl ListMessagesUseCase {
    /// 新しい ListMessagesUseCase を作成
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    /// 宛先のメッセージ履歴を永続化順で取得
    ///
    /// オフラインだった受信者はこの履歴取得で追いつく（再配信はしない）。
    pub async fn execute(&self, destination: Destination) -> Result<Vec<Message>, RepositoryError> {
        self.repository.list_messages(destination).await
    }
}

/// ユーザー一覧取得のユースケース
pub struct ListUsersUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
}

impl ListUsersUseCase {
    /// 新しい ListUsersUseCase を作成
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    /// 既知の全ユーザーを取得
    pub async fn execute(&self) -> Result<Vec<UserIdentity>, RepositoryError> {
        self.repository.list_users().await
    }
}
