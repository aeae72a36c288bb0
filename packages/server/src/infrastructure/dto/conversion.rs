//! Conversion logic between DTOs and domain entities.

use idobata_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    Conversation, ConversationId, Destination, Message, Room, RoomId, UserIdentity, ValueError,
};
use crate::infrastructure::dto::http;
use crate::infrastructure::dto::websocket as dto;

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<dto::DestinationDto> for Destination {
    type Error = ValueError;

    fn try_from(value: dto::DestinationDto) -> Result<Self, Self::Error> {
        match value {
            dto::DestinationDto::Room(id) => Ok(Destination::Room(RoomId::new(id))),
            dto::DestinationDto::Conversation(id) => {
                Ok(Destination::Conversation(ConversationId::new(id)?))
            }
        }
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<Destination> for dto::DestinationDto {
    fn from(value: Destination) -> Self {
        match value {
            Destination::Room(id) => dto::DestinationDto::Room(id.value()),
            Destination::Conversation(id) => dto::DestinationDto::Conversation(id.into_string()),
        }
    }
}

impl From<Message> for dto::MessageEvent {
    fn from(model: Message) -> Self {
        Self {
            r#type: dto::MessageType::Message,
            id: model.id.value(),
            sender_id: model.sender.value(),
            sender_name: model.sender_name,
            destination: model.destination.into(),
            content: model.content.into_string(),
            status: model.status.as_str().to_string(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}

impl From<UserIdentity> for dto::OnlineUserInfo {
    fn from(model: UserIdentity) -> Self {
        Self {
            user_id: model.id.value(),
            display_name: model.display_name,
        }
    }
}

impl From<UserIdentity> for http::UserDto {
    fn from(model: UserIdentity) -> Self {
        Self {
            id: model.id.value(),
            display_name: model.display_name,
        }
    }
}

impl From<Room> for http::RoomDto {
    fn from(model: Room) -> Self {
        let mut member_ids: Vec<i64> = model.members.iter().map(|m| m.value()).collect();
        member_ids.sort_unstable();
        Self {
            id: model.id.value(),
            name: model.name.into_string(),
            owner_id: model.owner.value(),
            member_ids,
        }
    }
}

impl From<Message> for http::MessageDto {
    fn from(model: Message) -> Self {
        Self {
            id: model.id.value(),
            sender_id: model.sender.value(),
            sender_name: model.sender_name,
            destination: model.destination.into(),
            content: model.content.into_string(),
            status: model.status.as_str().to_string(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}

impl From<Conversation> for http::ConversationDto {
    fn from(model: Conversation) -> Self {
        let (a, b) = model.participants;
        Self {
            conversation_id: model.id.into_string(),
            participant_ids: vec![a.value(), b.value()],
        }
    }
}
