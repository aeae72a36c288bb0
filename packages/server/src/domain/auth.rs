//! Authenticator trait 定義
//!
//! 資格情報の保存・検証は外部コラボレータの責務であり、ドメイン層は
//! 「トークンを渡すと認証済みユーザーが返る」能力だけを要求する。
//! 接続確立時に一度だけ呼ばれ、失敗した接続はレジストリに入る前に
//! 閉じられる。

use async_trait::async_trait;

use super::entity::UserIdentity;

/// 認証エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing credential token")]
    MissingToken,
    #[error("invalid credential token")]
    InvalidToken,
    #[error("expired credential token")]
    ExpiredToken,
}

/// Authenticator trait
///
/// トークン検証のインターフェース。具体的な実装（JWT など）は
/// Infrastructure 層が提供する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// 資格情報トークンを検証し、認証済みユーザーを返す
    async fn verify_credential(&self, token: &str) -> Result<UserIdentity, AuthError>;
}
