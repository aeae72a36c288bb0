//! UseCase 層のエラー定義
//!
//! リクエスト単位のエラーは発信元の接続・レスポンスにのみ返り、
//! 他の受信者に波及することはない。

use crate::domain::{Destination, RepositoryError, RoomId};

/// 宛先解決（ファンアウト）のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FanoutError {
    #[error("unknown destination: {0}")]
    DestinationNotFound(Destination),
    #[error(transparent)]
    Repository(RepositoryError),
}

/// 接続確立処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("failed to record user: {0}")]
    Repository(#[from] RepositoryError),
}

/// メッセージ送信処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendMessageError {
    #[error("unknown destination: {0}")]
    DestinationNotFound(Destination),
    #[error("failed to persist message: {0}")]
    Persistence(RepositoryError),
}

impl From<FanoutError> for SendMessageError {
    fn from(e: FanoutError) -> Self {
        match e {
            FanoutError::DestinationNotFound(d) => Self::DestinationNotFound(d),
            FanoutError::Repository(e) => Self::Persistence(e),
        }
    }
}

/// タイピング通知処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypingError {
    #[error("unknown destination: {0}")]
    DestinationNotFound(Destination),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<FanoutError> for TypingError {
    fn from(e: FanoutError) -> Self {
        match e {
            FanoutError::DestinationNotFound(d) => Self::DestinationNotFound(d),
            FanoutError::Repository(e) => Self::Repository(e),
        }
    }
}

/// 既読通知処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeenError {
    #[error("unknown destination: {0}")]
    DestinationNotFound(Destination),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<FanoutError> for SeenError {
    fn from(e: FanoutError) -> Self {
        match e {
            FanoutError::DestinationNotFound(d) => Self::DestinationNotFound(d),
            FanoutError::Repository(e) => Self::Repository(e),
        }
    }
}

/// ルームメンバーシップ操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomMembershipError {
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for RoomMembershipError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::RoomNotFound(id) => Self::RoomNotFound(id),
            e => Self::Repository(e),
        }
    }
}

/// 会話解決処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("cannot open a conversation with oneself")]
    SelfConversation,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
