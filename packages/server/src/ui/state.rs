//! Server state and connection management.

use std::sync::Arc;

use crate::domain::Authenticator;
use crate::usecase::{
    ConnectUserUseCase, CreateRoomUseCase, DisconnectUserUseCase, ListMessagesUseCase,
    ListRoomsUseCase, ListUsersUseCase, MarkSeenUseCase, OpenConversationUseCase,
    RoomMembershipUseCase, SendMessageUseCase, TypingUseCase,
};

/// Shared application state
pub struct AppState {
    /// Authenticator（認証コラボレータの抽象化）
    pub authenticator: Arc<dyn Authenticator>,
    /// ConnectUserUseCase（接続確立のユースケース）
    pub connect_user_usecase: Arc<ConnectUserUseCase>,
    /// DisconnectUserUseCase（切断のユースケース）
    pub disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// TypingUseCase（タイピング通知のユースケース）
    pub typing_usecase: Arc<TypingUseCase>,
    /// MarkSeenUseCase（既読通知のユースケース）
    pub mark_seen_usecase: Arc<MarkSeenUseCase>,
    /// RoomMembershipUseCase（ルーム参加・退出のユースケース）
    pub room_membership_usecase: Arc<RoomMembershipUseCase>,
    /// OpenConversationUseCase（会話解決のユースケース）
    pub open_conversation_usecase: Arc<OpenConversationUseCase>,
    /// CreateRoomUseCase（ルーム作成のユースケース）
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    /// ListRoomsUseCase（ルーム一覧のユースケース）
    pub list_rooms_usecase: Arc<ListRoomsUseCase>,
    /// ListMessagesUseCase（履歴取得のユースケース）
    pub list_messages_usecase: Arc<ListMessagesUseCase>,
    /// ListUsersUseCase（ユーザー一覧のユースケース）
    pub list_users_usecase: Arc<ListUsersUseCase>,
}
