//! UseCase: ルームメンバーシップ操作
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RoomMembershipUseCase の join / leave メソッド
//!
//! ### なぜこのテストが必要か
//! - join の冪等性（二度 join しても no-op）を保証
//! - 存在しないルームへの join がリクエスト単位のエラーになることを確認
//! - leave の冪等性を保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：join → leave
//! - エッジケース：重複 join、未参加ルームからの leave
//! - 異常系：存在しないルームへの join

use std::sync::Arc;

use crate::domain::{ChatRepository, RoomId, UserId};

use super::error::RoomMembershipError;

/// ルームメンバーシップ操作のユースケース
pub struct RoomMembershipUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
}

impl RoomMembershipUseCase {
    /// 新しい RoomMembershipUseCase を作成
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    /// ルームに参加する（冪等）
    ///
    /// 存在しないルームへの参加は `RoomNotFound`
    pub async fn join(&self, user: UserId, room_id: RoomId) -> Result<(), RoomMembershipError> {
        self.repository.add_room_member(room_id, user).await?;
        tracing::info!("User {} joined room {}", user, room_id);
        Ok(())
    }

    /// ルームから退出する（冪等）
    pub async fn leave(&self, user: UserId, room_id: RoomId) -> Result<(), RoomMembershipError> {
        self.repository.remove_room_member(room_id, user).await?;
        tracing::info!("User {} left room {}", user, room_id);
        Ok(())
    }
}
