//! InMemory Chat Repository 実装
//!
//! ドメイン層が定義する ChatRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ## 技術的負債
//!
//! 現在、ドメインモデルを直接ストレージとして使用しています。
//! これは InMemory 実装では許容される妥協ですが、将来 SQLite / PostgreSQL
//! などの DBMS を実装する際は、以下の変換層が必要になります：
//!
//! ```text
//! DB Row → MessageRecord (DTO) → Message (ドメインモデル)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use idobata_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    ChatRepository, Conversation, ConversationId, Destination, Message, MessageContent, MessageId,
    MessageStatus, RepositoryError, Room, RoomId, RoomName, Timestamp, UserId, UserIdentity,
};

#[derive(Default)]
struct Store {
    users: HashMap<UserId, UserIdentity>,
    rooms: HashMap<RoomId, Room>,
    conversations: HashMap<ConversationId, Conversation>,
    messages: Vec<Message>,
    next_room_id: i64,
    next_message_id: i64,
}

/// インメモリ Chat Repository 実装
///
/// 全テーブルを単一の Mutex で保護する。ID はストレージ側で採番し、
/// メッセージの作成時刻は注入された Clock から取得する。
pub struct InMemoryChatRepository {
    store: Mutex<Store>,
    clock: Arc<dyn Clock>,
}

impl InMemoryChatRepository {
    /// 新しい InMemoryChatRepository を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            clock,
        }
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn ensure_user(&self, identity: UserIdentity) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        store.users.insert(identity.id, identity);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserIdentity>, RepositoryError> {
        let store = self.store.lock().await;
        let mut users: Vec<UserIdentity> = store.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn create_room(&self, name: RoomName, owner: UserId) -> Result<Room, RepositoryError> {
        let mut store = self.store.lock().await;
        store.next_room_id += 1;
        let room = Room::new(RoomId::new(store.next_room_id), name, owner);
        store.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        let store = self.store.lock().await;
        let mut rooms: Vec<Room> = store.rooms.values().cloned().collect();
        rooms.sort_by_key(|r| r.id);
        Ok(rooms)
    }

    async fn add_room_member(&self, room_id: RoomId, user: UserId) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let room = store
            .rooms
            .get_mut(&room_id)
            .ok_or(RepositoryError::RoomNotFound(room_id))?;
        room.add_member(user);
        Ok(())
    }

    async fn remove_room_member(
        &self,
        room_id: RoomId,
        user: UserId,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        // 存在しないルームからの削除も冪等に成功させる
        if let Some(room) = store.rooms.get_mut(&room_id) {
            room.remove_member(&user);
        }
        Ok(())
    }

    async fn resolve_or_create_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Conversation, RepositoryError> {
        let id = ConversationId::from_pair(a, b);
        let mut store = self.store.lock().await;
        let conversation = store
            .conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation::new(id))
            .clone();
        Ok(conversation)
    }

    async fn members_of(&self, destination: Destination) -> Result<Vec<UserId>, RepositoryError> {
        match destination {
            Destination::Room(room_id) => {
                let store = self.store.lock().await;
                let room = store
                    .rooms
                    .get(&room_id)
                    .ok_or(RepositoryError::RoomNotFound(room_id))?;
                Ok(room.members.iter().copied().collect())
            }
            Destination::Conversation(conversation_id) => {
                // 正準 ID が参加者を持つため、レコードの有無に依存しない
                let (a, b) = conversation_id.participants();
                Ok(vec![a, b])
            }
        }
    }

    async fn append_message(
        &self,
        sender: UserIdentity,
        destination: Destination,
        content: MessageContent,
    ) -> Result<Message, RepositoryError> {
        let mut store = self.store.lock().await;

        match &destination {
            Destination::Room(room_id) => {
                if !store.rooms.contains_key(room_id) {
                    return Err(RepositoryError::RoomNotFound(*room_id));
                }
            }
            Destination::Conversation(conversation_id) => {
                // 最初のメッセージで会話レコードを遅延作成する
                store
                    .conversations
                    .entry(conversation_id.clone())
                    .or_insert_with(|| Conversation::new(conversation_id.clone()));
            }
        }

        store.next_message_id += 1;
        let message = Message {
            id: MessageId::new(store.next_message_id),
            sender: sender.id,
            sender_name: sender.display_name,
            destination,
            content,
            status: MessageStatus::Sent,
            created_at: Timestamp::new(self.clock.now_utc_millis()),
        };
        store.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        destination: Destination,
    ) -> Result<Vec<Message>, RepositoryError> {
        let store = self.store.lock().await;
        if let Destination::Room(room_id) = &destination {
            if !store.rooms.contains_key(room_id) {
                return Err(RepositoryError::RoomNotFound(*room_id));
            }
        }
        Ok(store
            .messages
            .iter()
            .filter(|m| m.destination == destination)
            .cloned()
            .collect())
    }

    async fn advance_message_status(
        &self,
        message_id: MessageId,
        to: MessageStatus,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let message = store
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(RepositoryError::MessageNotFound(message_id))?;
        message.status = message.status.advance_to(to);
        Ok(())
    }
}
