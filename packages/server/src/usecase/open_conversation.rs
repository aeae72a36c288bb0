//! UseCase: 会話の解決
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - OpenConversationUseCase::execute() メソッド
//! - 会話 ID の正準化（引数順序への非依存）と遅延作成
//!
//! ### なぜこのテストが必要か
//! - どちらのユーザーから解決しても同じ会話に収束することを保証
//!   （クライアント間のネゴシエーションを不要にする設計の要）
//! - 自分自身との会話が拒否されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：初回の解決（作成）、再解決（既存を返す）
//! - 異常系：自分自身との会話

use std::sync::Arc;

use crate::domain::{ChatRepository, Conversation, UserId};

use super::error::ConversationError;

/// 会話解決のユースケース
pub struct OpenConversationUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
}

impl OpenConversationUseCase {
    /// 新しい OpenConversationUseCase を作成
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    /// 2 ユーザー間の会話を解決する（存在しなければ作成）
    pub async fn execute(&self, a: UserId, b: UserId) -> Result<Conversation, ConversationError> {
        if a == b {
            return Err(ConversationError::SelfConversation);
        }
        let conversation = self.repository.resolve_or_create_conversation(a, b).await?;
        Ok(conversation)
    }
}
