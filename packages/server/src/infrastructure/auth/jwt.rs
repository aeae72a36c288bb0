//! JWT を使った Authenticator 実装
//!
//! HS256 署名のアクセストークンを検証し、認証済みユーザーを返します。
//! トークンの発行は本来 Identity コラボレータの責務ですが、デモと
//! テストのために `issue` も提供します。
//!
//! Claims:
//! - `sub`: ユーザー ID
//! - `name`: 表示名
//! - `exp`: 有効期限（Unix 秒）

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, Authenticator, UserId, UserIdentity};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject (user ID)
    sub: i64,
    /// Display name
    name: String,
    /// Expiration time (Unix timestamp, seconds)
    exp: i64,
}

/// JWT（HS256）による Authenticator 実装
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtAuthenticator {
    /// 共有シークレットから Authenticator を作成
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// アクセストークンを発行する
    ///
    /// # Arguments
    ///
    /// * `identity` - トークンに埋め込むユーザー
    /// * `ttl_secs` - 有効期間（秒）。負の値を渡すと期限切れトークンになる
    pub fn issue(&self, identity: &UserIdentity, ttl_secs: i64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: identity.id.value(),
            name: identity.display_name.clone(),
            exp: chrono::Utc::now().timestamp() + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn verify_credential(&self, token: &str) -> Result<UserIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let token_data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })?;

        Ok(UserIdentity::new(
            UserId::new(token_data.claims.sub),
            token_data.claims.name,
        ))
    }
}
