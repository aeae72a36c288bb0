//! UseCase 層
//!
//! 境界操作ごとに 1 ユースケース。各ユースケースはドメイン層の trait
//! （Repository / Authenticator / MessagePusher）にのみ依存する。

mod connect_user;
mod directory;
mod disconnect_user;
mod error;
mod fanout;
mod mark_seen;
mod open_conversation;
mod room_membership;
mod send_message;
mod typing;

pub use connect_user::{ConnectOutcome, ConnectUserUseCase};
pub use directory::{CreateRoomUseCase, ListMessagesUseCase, ListRoomsUseCase, ListUsersUseCase};
pub use disconnect_user::{DisconnectOutcome, DisconnectUserUseCase};
pub use error::{
    ConnectError, ConversationError, FanoutError, RoomMembershipError, SeenError,
    SendMessageError, TypingError,
};
pub use fanout::{FanoutResolver, RecipientFilter};
pub use mark_seen::MarkSeenUseCase;
pub use open_conversation::OpenConversationUseCase;
pub use room_membership::RoomMembershipUseCase;
pub use send_message::SendMessageUseCase;
pub use typing::{DEFAULT_TYPING_TTL, TypingUseCase};
