//! 宛先解決（Membership Manager）
//!
//! 論理的な宛先（ルーム ID / 会話 ID）をメンバーのユーザー ID 集合に、
//! さらにセッションレジストリ経由でライブ接続の集合に解決する。
//! メッセージ・タイピング・既読の各ファンアウトはすべてこの解決を通る。

use std::sync::Arc;

use crate::domain::{
    ChatRepository, ConnectionId, Destination, RepositoryError, SharedSessionRegistry, UserId,
};

use super::error::FanoutError;

/// ファンアウト対象の絞り込み
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientFilter {
    /// 全メンバーの全接続（送信者自身の接続も含む）
    AllMembers,
    /// 指定ユーザーの接続を全て除外（タイピング・既読の配信用）
    ExcludeUser(UserId),
}

/// 宛先 → メンバー → ライブ接続のリゾルバ
pub struct FanoutResolver {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
    /// セッションレジストリ（ユーザー ⇔ 接続）
    registry: SharedSessionRegistry,
}

impl FanoutResolver {
    /// 新しい FanoutResolver を作成
    pub fn new(repository: Arc<dyn ChatRepository>, registry: SharedSessionRegistry) -> Self {
        Self {
            repository,
            registry,
        }
    }

    /// 宛先のメンバーを取得する
    ///
    /// 存在しないルームは `DestinationNotFound`
    pub async fn members_of(&self, destination: &Destination) -> Result<Vec<UserId>, FanoutError> {
        self.repository
            .members_of(destination.clone())
            .await
            .map_err(|e| match e {
                RepositoryError::RoomNotFound(_) => {
                    FanoutError::DestinationNotFound(destination.clone())
                }
                e => FanoutError::Repository(e),
            })
    }

    /// メンバー集合をライブ接続に解決する
    pub async fn connections_for(
        &self,
        members: &[UserId],
        filter: RecipientFilter,
    ) -> Vec<ConnectionId> {
        let exclude = match &filter {
            RecipientFilter::AllMembers => None,
            RecipientFilter::ExcludeUser(user) => Some(user),
        };
        let registry = self.registry.lock().await;
        registry.connections_for_users(members.iter(), exclude)
    }

    /// 宛先をライブ接続の集合まで一括で解決する
    pub async fn resolve(
        &self,
        destination: &Destination,
        filter: RecipientFilter,
    ) -> Result<Vec<ConnectionId>, FanoutError> {
        let members = self.members_of(destination).await?;
        Ok(self.connections_for(&members, filter).await)
    }
}
