//! WebSocket connection handlers.
//!
//! The upgrade handler is the authentication gate: a connection that does
//! not present a valid credential token is rejected with 401 before any
//! coordinator state is touched. The socket teardown path runs the
//! disconnect contract (deregistration, forced typing stops, presence
//! re-evaluation) before the connection task returns.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, Destination, DeregisterTransition, MessageContent, MessageId, RoomId,
        UserIdentity,
    },
    infrastructure::dto::websocket::{
        ClientEvent, DestinationDto, ErrorMessage, MessageEvent, MessageSeenMessage, MessageType,
        OnlineSnapshotMessage, OnlineUserInfo, TypingStartMessage, TypingStopMessage,
        UserOfflineMessage, UserOnlineMessage,
    },
    ui::state::AppState,
    usecase::{RoomMembershipError, SeenError, SendMessageError, TypingError},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Authentication gate: runs before any registry/presence/membership
    // mutation, so a rejected connection leaves no trace behind.
    let token = query.token.unwrap_or_default();
    let identity = match state.authenticator.verify_credential(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("Rejecting unauthenticated connection: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let connection_id = ConnectionId::generate();

    // Create a channel for this connection to receive messages.
    // A clone is kept for request-scoped error events to this connection.
    let (tx, rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();

    match state
        .connect_user_usecase
        .execute(identity.clone(), connection_id, tx)
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                "User {} ('{}') connected as '{}'",
                identity.id,
                identity.display_name,
                connection_id
            );
            Ok(ws.on_upgrade(move |socket| {
                handle_socket(socket, state, identity, connection_id, rx, error_tx, outcome)
            }))
        }
        Err(e) => {
            tracing::error!("Failed to register connection '{}': {}", connection_id, e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// This function handles the outbound message flow: events fanned out to
/// this connection (via the rx channel) are written to the socket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

#[allow(clippy::too_many_arguments)]
async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    identity: UserIdentity,
    connection_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<String>,
    error_tx: mpsc::UnboundedSender<String>,
    outcome: crate::usecase::ConnectOutcome,
) {
    let (mut sender, mut receiver) = socket.split();

    // Send the online snapshot to the newly connected client first, so it
    // does not need to poll for who is currently online.
    {
        let snapshot = OnlineSnapshotMessage {
            r#type: MessageType::OnlineSnapshot,
            users: outcome
                .online_snapshot
                .into_iter()
                .map(OnlineUserInfo::from)
                .collect(),
        };
        let snapshot_json = serde_json::to_string(&snapshot).unwrap();
        if let Err(e) = sender.send(Message::Text(snapshot_json.into())).await {
            tracing::warn!(
                "Failed to send online snapshot to '{}': {}",
                connection_id,
                e
            );
        }
    }

    // Broadcast user_online to everyone else, but only on the
    // offline -> online edge (a second device stays silent).
    if !outcome.presence_targets.is_empty() {
        let online = UserOnlineMessage {
            r#type: MessageType::UserOnline,
            user_id: identity.id.value(),
            display_name: identity.display_name.clone(),
        };
        let online_json = serde_json::to_string(&online).unwrap();
        state
            .connect_user_usecase
            .broadcast_user_online(outcome.presence_targets, &online_json)
            .await;
    }

    let state_clone = state.clone();
    let identity_clone = identity.clone();

    // Task receiving client events from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error on '{}': {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let event = match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!("Failed to parse client event: {}", e);
                            send_error(
                                &error_tx,
                                ErrorMessage::new("malformed", "unrecognized event payload"),
                            );
                            continue;
                        }
                    };

                    if let Err(error) =
                        process_client_event(&state_clone, &identity_clone, event).await
                    {
                        send_error(&error_tx, error);
                    }
                }
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Task pushing fanned-out events to this connection
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Disconnect contract: deregister, force typing stops, re-evaluate
    // presence. These run before the connection's resources are released.
    match state.disconnect_user_usecase.execute(connection_id).await {
        Some(outcome) => {
            tracing::info!(
                "Connection '{}' of user {} closed",
                connection_id,
                outcome.identity.id
            );

            if outcome.transition == DeregisterTransition::WentOffline {
                let user_id = outcome.identity.id;

                // A dropped client must never leave a permanent
                // "typing..." indicator behind.
                state
                    .typing_usecase
                    .force_stop_all(user_id, |destination| {
                        serde_json::to_string(&TypingStopMessage {
                            r#type: MessageType::TypingStop,
                            user_id: user_id.value(),
                            destination: destination.clone().into(),
                        })
                        .unwrap()
                    })
                    .await;

                let offline = UserOfflineMessage {
                    r#type: MessageType::UserOffline,
                    user_id: user_id.value(),
                };
                let offline_json = serde_json::to_string(&offline).unwrap();
                state
                    .disconnect_user_usecase
                    .broadcast_user_offline(outcome.offline_targets, &offline_json)
                    .await;
            }
        }
        None => {
            tracing::warn!("Connection '{}' was not registered at close", connection_id);
        }
    }
}

/// Queue a request-scoped error event to the originating connection only.
fn send_error(error_tx: &mpsc::UnboundedSender<String>, error: ErrorMessage) {
    let json = serde_json::to_string(&error).unwrap();
    if error_tx.send(json).is_err() {
        tracing::debug!("Connection closed before error event could be queued");
    }
}

fn parse_destination(dto: DestinationDto) -> Result<Destination, ErrorMessage> {
    Destination::try_from(dto).map_err(|e| ErrorMessage::new("validation", e.to_string()))
}

/// Dispatch one inbound client event.
///
/// Returns the error event to send back to the originating connection;
/// errors never reach other recipients.
async fn process_client_event(
    state: &Arc<AppState>,
    identity: &UserIdentity,
    event: ClientEvent,
) -> Result<(), ErrorMessage> {
    match event {
        ClientEvent::JoinRoom { room_id } => state
            .room_membership_usecase
            .join(identity.id, RoomId::new(room_id))
            .await
            .map_err(room_membership_error),
        ClientEvent::LeaveRoom { room_id } => state
            .room_membership_usecase
            .leave(identity.id, RoomId::new(room_id))
            .await
            .map_err(room_membership_error),
        ClientEvent::SendMessage {
            destination,
            content,
        } => {
            let destination = parse_destination(destination)?;
            let content = MessageContent::new(content)
                .map_err(|e| ErrorMessage::new("validation", e.to_string()))?;
            state
                .send_message_usecase
                .execute(identity.clone(), destination, content, |message| {
                    serde_json::to_string(&MessageEvent::from(message.clone())).unwrap()
                })
                .await
                .map(|_| ())
                .map_err(|e| match e {
                    SendMessageError::DestinationNotFound(_) => {
                        ErrorMessage::new("not_found", e.to_string())
                    }
                    SendMessageError::Persistence(_) => {
                        ErrorMessage::new("persistence", e.to_string())
                    }
                })
        }
        ClientEvent::TypingStart { destination } => {
            let dto = destination.clone();
            let destination = parse_destination(destination)?;
            let start = serde_json::to_string(&TypingStartMessage {
                r#type: MessageType::TypingStart,
                user_id: identity.id.value(),
                display_name: identity.display_name.clone(),
                destination: dto.clone(),
            })
            .unwrap();
            let stop = serde_json::to_string(&TypingStopMessage {
                r#type: MessageType::TypingStop,
                user_id: identity.id.value(),
                destination: dto,
            })
            .unwrap();
            state
                .typing_usecase
                .start(identity.id, destination, &start, stop)
                .await
                .map_err(typing_error)
        }
        ClientEvent::TypingStop { destination } => {
            let dto = destination.clone();
            let destination = parse_destination(destination)?;
            let stop = serde_json::to_string(&TypingStopMessage {
                r#type: MessageType::TypingStop,
                user_id: identity.id.value(),
                destination: dto,
            })
            .unwrap();
            state
                .typing_usecase
                .stop(identity.id, destination, &stop)
                .await
                .map_err(typing_error)
        }
        ClientEvent::MarkSeen {
            message_id,
            destination,
        } => {
            let destination = parse_destination(destination)?;
            let seen = serde_json::to_string(&MessageSeenMessage {
                r#type: MessageType::MessageSeen,
                message_id,
                seen_by: identity.id.value(),
                seen_by_name: identity.display_name.clone(),
            })
            .unwrap();
            state
                .mark_seen_usecase
                .execute(identity.id, MessageId::new(message_id), destination, &seen)
                .await
                .map_err(|e| match e {
                    SeenError::DestinationNotFound(_) => {
                        ErrorMessage::new("not_found", e.to_string())
                    }
                    SeenError::Repository(_) => ErrorMessage::new("persistence", e.to_string()),
                })
        }
    }
}

fn room_membership_error(e: RoomMembershipError) -> ErrorMessage {
    match e {
        RoomMembershipError::RoomNotFound(_) => ErrorMessage::new("not_found", e.to_string()),
        RoomMembershipError::Repository(_) => ErrorMessage::new("persistence", e.to_string()),
    }
}

fn typing_error(e: TypingError) -> ErrorMessage {
    match e {
        TypingError::DestinationNotFound(_) => ErrorMessage::new("not_found", e.to_string()),
        TypingError::Repository(_) => ErrorMessage::new("persistence", e.to_string()),
    }
}
