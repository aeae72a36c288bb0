//! ドメイン層の Value Object 定義
//!
//! 不変条件を型で保証するための newtype 群。生成時にバリデーションを行い、
//! 不正な値はドメイン層に入り込まない（Parse, don't validate）。

use std::fmt;

use uuid::Uuid;

/// メッセージ本文の最大長（文字数）
pub const MAX_MESSAGE_CONTENT_LENGTH: usize = 4096;

/// ルーム名の最大長（文字数）
pub const MAX_ROOM_NAME_LENGTH: usize = 128;

/// Value Object のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("message content must not be empty")]
    EmptyMessageContent,
    #[error("message content exceeds {MAX_MESSAGE_CONTENT_LENGTH} characters (got {0})")]
    MessageContentTooLong(usize),
    #[error("room name must not be empty")]
    EmptyRoomName,
    #[error("room name exceeds {MAX_ROOM_NAME_LENGTH} characters (got {0})")]
    RoomNameTooLong(usize),
    #[error("malformed conversation id: '{0}'")]
    MalformedConversationId(String),
}

/// ユーザー ID
///
/// ストレージが採番する整数 ID。認証コラボレータが発行する
/// `UserIdentity` に含まれ、接続の生存期間中は不変。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(i64);

impl UserId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 接続 ID
///
/// プロセスローカルな WebSocket 接続のハンドル。接続確立時に採番され、
/// 永続化されることはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 新しい接続 ID を生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ルーム ID（ストレージが採番）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(i64);

impl RoomId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// メッセージ ID（ストレージが採番）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(i64);

impl MessageId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 会話 ID
///
/// 1:1 会話の正準 ID。参加者 2 人のユーザー ID を昇順に並べた
/// `conv_{小}_{大}` 形式で、どちらのユーザーから解決しても同じ ID になる。
/// ID 自体が参加者を持つため、逆引きテーブルなしで参加者を復元できる。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    /// 2 人のユーザー ID から正準化された会話 ID を生成
    ///
    /// 引数の順序に依存しない: `from_pair(a, b) == from_pair(b, a)`
    pub fn from_pair(a: UserId, b: UserId) -> Self {
        let (lo, hi) = if a.value() <= b.value() {
            (a.value(), b.value())
        } else {
            (b.value(), a.value())
        };
        Self(format!("conv_{}_{}", lo, hi))
    }

    /// 外部から受け取った文字列を検証して会話 ID に変換
    ///
    /// `conv_{小}_{大}`（小 < 大）以外の形式は `MalformedConversationId`
    pub fn new(value: String) -> Result<Self, ValueError> {
        match Self::parse_pair(&value) {
            Some((lo, hi)) if lo < hi => Ok(Self(value)),
            _ => Err(ValueError::MalformedConversationId(value)),
        }
    }

    /// 会話の参加者 2 人を ID から復元
    pub fn participants(&self) -> (UserId, UserId) {
        // new / from_pair で形式が保証されているためパースは失敗しない
        let (lo, hi) = Self::parse_pair(&self.0).unwrap_or((0, 0));
        (UserId::new(lo), UserId::new(hi))
    }

    fn parse_pair(value: &str) -> Option<(i64, i64)> {
        let rest = value.strip_prefix("conv_")?;
        let (lo, hi) = rest.split_once('_')?;
        Some((lo.parse().ok()?, hi.parse().ok()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// メッセージのファンアウト先
///
/// ルームか 1:1 会話のどちらか。文字列プレフィックスではなく型で
/// 区別するため、名前空間の衝突が起こらない。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Room(RoomId),
    Conversation(ConversationId),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room(id) => write!(f, "room:{}", id),
            Self::Conversation(id) => write!(f, "conversation:{}", id),
        }
    }
}

/// ルーム名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(value: String) -> Result<Self, ValueError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueError::EmptyRoomName);
        }
        if trimmed.chars().count() > MAX_ROOM_NAME_LENGTH {
            return Err(ValueError::RoomNameTooLong(trimmed.chars().count()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// メッセージ本文
///
/// 空文字・空白のみの本文は拒否する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueError> {
        if value.trim().is_empty() {
            return Err(ValueError::EmptyMessageContent);
        }
        if value.chars().count() > MAX_MESSAGE_CONTENT_LENGTH {
            return Err(ValueError::MessageContentTooLong(value.chars().count()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix タイムスタンプ（UTC、ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
