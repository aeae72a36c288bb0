//! ドメイン層
//!
//! Entity・Value Object・コーディネータ固有の状態機械（セッション
//! レジストリ、タイピングテーブル）と、外部コラボレータへの
//! インターフェース（Repository / Authenticator / MessagePusher）を定義する。

pub mod auth;
pub mod entity;
pub mod pusher;
pub mod repository;
pub mod session;
pub mod typing;
pub mod value_object;

pub use auth::{AuthError, Authenticator};
pub use entity::{Conversation, Message, MessageStatus, Room, UserIdentity};
pub use pusher::{MessagePushError, MessagePusher, PusherChannel};
pub use repository::{ChatRepository, RepositoryError};
pub use session::{
    DeregisterTransition, Deregistration, RegisterTransition, SessionRegistry,
    SharedSessionRegistry,
};
pub use typing::{TypingStart, TypingStop, TypingTable};
pub use value_object::{
    ConnectionId, ConversationId, Destination, MessageContent, MessageId, RoomId, RoomName,
    Timestamp, UserId, ValueError,
};
