//! HTTP API request/response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::DestinationDto;

/// Request body for `POST /api/rooms`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

/// Room representation for HTTP responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDto {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub member_ids: Vec<i64>,
}

/// User representation for HTTP responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub display_name: String,
}

/// Message representation for history responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub destination: DestinationDto,
    pub content: String,
    pub status: String,
    pub created_at: String,
}

/// Request body for `POST /api/conversations`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenConversationRequest {
    pub peer_id: i64,
}

/// Conversation representation for HTTP responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDto {
    pub conversation_id: String,
    pub participant_ids: Vec<i64>,
}

/// Error body for failed HTTP requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
