//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};

use crate::{
    domain::{AuthError, ConversationId, Destination, RoomId, RoomName, UserIdentity},
    infrastructure::dto::http::{
        ConversationDto, CreateRoomRequest, ErrorBody, MessageDto, OpenConversationRequest,
        RoomDto, UserDto,
    },
    ui::state::AppState,
    usecase::ConversationError,
};

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Authenticate an HTTP request via its `Authorization: Bearer` header.
async fn bearer_identity(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<UserIdentity, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .unwrap_or_default();

    state
        .authenticator
        .verify_credential(token)
        .await
        .map_err(|e| match e {
            AuthError::MissingToken => api_error(StatusCode::UNAUTHORIZED, "missing token"),
            AuthError::ExpiredToken => api_error(StatusCode::UNAUTHORIZED, "expired token"),
            AuthError::InvalidToken => api_error(StatusCode::UNAUTHORIZED, "invalid token"),
        })
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of known users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let users = state.list_users_usecase.execute().await.map_err(|e| {
        tracing::error!("Failed to list users: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to list users")
    })?;

    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// Get list of rooms
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let rooms = state.list_rooms_usecase.execute().await.map_err(|e| {
        tracing::error!("Failed to list rooms: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to list rooms")
    })?;

    Ok(Json(rooms.into_iter().map(RoomDto::from).collect()))
}

/// Create a room owned by the authenticated caller
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomDto>, ApiError> {
    let identity = bearer_identity(&state, &headers).await?;

    let name = RoomName::new(request.name)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let room = state
        .create_room_usecase
        .execute(name, identity.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create room: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to create room")
        })?;

    Ok(Json(room.into()))
}

/// Get message history for a destination
///
/// `kind` is `room` or `conversation`; `id` is the room id or the
/// canonical conversation id.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let destination = match kind.as_str() {
        "room" => {
            let room_id: i64 = id
                .parse()
                .map_err(|_| api_error(StatusCode::BAD_REQUEST, "invalid room id"))?;
            Destination::Room(RoomId::new(room_id))
        }
        "conversation" => Destination::Conversation(
            ConversationId::new(id)
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        ),
        _ => return Err(api_error(StatusCode::BAD_REQUEST, "unknown destination kind")),
    };

    let messages = state
        .list_messages_usecase
        .execute(destination)
        .await
        .map_err(|e| match e {
            crate::domain::RepositoryError::RoomNotFound(id) => {
                api_error(StatusCode::NOT_FOUND, format!("room not found: {}", id))
            }
            e => {
                tracing::error!("Failed to list messages: {}", e);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to list messages")
            }
        })?;

    Ok(Json(messages.into_iter().map(MessageDto::from).collect()))
}

/// Resolve (or create) the conversation between the caller and a peer
pub async fn open_conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<OpenConversationRequest>,
) -> Result<Json<ConversationDto>, ApiError> {
    let identity = bearer_identity(&state, &headers).await?;

    let conversation = state
        .open_conversation_usecase
        .execute(identity.id, crate::domain::UserId::new(request.peer_id))
        .await
        .map_err(|e| match e {
            ConversationError::SelfConversation => {
                api_error(StatusCode::BAD_REQUEST, e.to_string())
            }
            ConversationError::Repository(e) => {
                tracing::error!("Failed to open conversation: {}", e);
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to open conversation",
                )
            }
        })?;

    Ok(Json(conversation.into()))
}
