//! ドメイン層の Entity 定義

use std::collections::HashSet;

use super::value_object::{
    ConversationId, Destination, MessageContent, MessageId, RoomId, RoomName, Timestamp, UserId,
};

/// 認証済みユーザーの識別情報
///
/// 認証コラボレータが発行する。接続の生存期間中は不変。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub display_name: String,
}

impl UserIdentity {
    pub fn new(id: UserId, display_name: String) -> Self {
        Self { id, display_name }
    }
}

/// チャットルーム
///
/// 明示的に作成され、オーナーは作成時点でメンバーに含まれる。
/// メンバーシップは join で増え、明示的な leave 以外で減ることはない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub name: RoomName,
    pub owner: UserId,
    pub members: HashSet<UserId>,
}

impl Room {
    /// 新しいルームを作成（オーナーを自動的にメンバーに追加）
    pub fn new(id: RoomId, name: RoomName, owner: UserId) -> Self {
        let mut members = HashSet::new();
        members.insert(owner);
        Self {
            id,
            name,
            owner,
            members,
        }
    }

    /// メンバーを追加（冪等、追加されたら true）
    pub fn add_member(&mut self, user: UserId) -> bool {
        self.members.insert(user)
    }

    /// メンバーを削除（冪等、削除されたら true）
    pub fn remove_member(&mut self, user: &UserId) -> bool {
        self.members.remove(user)
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }
}

/// 1:1 会話
///
/// 最初のメッセージ送信または明示的な解決時に遅延作成され、削除されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: (UserId, UserId),
}

impl Conversation {
    /// 正準化済みの会話 ID から会話を作成
    pub fn new(id: ConversationId) -> Self {
        let participants = id.participants();
        Self { id, participants }
    }
}

/// メッセージの配信ステータス
///
/// 遷移は前方のみ: Sending → Sent → Delivered → Seen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Seen,
}

impl MessageStatus {
    fn rank(&self) -> u8 {
        match self {
            Self::Sending => 0,
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Seen => 3,
        }
    }

    /// `to` への遷移が前方かどうか
    pub fn precedes(&self, to: &Self) -> bool {
        self.rank() < to.rank()
    }

    /// 前方遷移のみ適用する（後退・同値は現在値を維持）
    pub fn advance_to(self, to: Self) -> Self {
        if self.precedes(&to) { to } else { self }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Seen => "seen",
        }
    }
}

/// チャットメッセージ
///
/// `id` と `created_at` は永続化時にストレージが採番する。
/// `sender_name` は配信時の表示用に送信者名を非正規化したもの。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    pub sender_name: String,
    pub destination: Destination,
    pub content: MessageContent,
    pub status: MessageStatus,
    pub created_at: Timestamp,
}
