//! 認証コラボレータの実装
//!
//! - `jwt`: JWT（HS256）を使った実装

pub mod jwt;

pub use jwt::JwtAuthenticator;
