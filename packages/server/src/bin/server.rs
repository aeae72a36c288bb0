//! Real-time messaging coordinator server.
//!
//! Authenticates WebSocket connections, tracks presence, and fans out
//! chat messages, typing signals and read receipts to room and
//! conversation members.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin idobata-server
//! cargo run --bin idobata-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Mutex;

use idobata_server::{
    domain::SessionRegistry,
    infrastructure::{
        auth::JwtAuthenticator, message_pusher::WebSocketMessagePusher,
        repository::InMemoryChatRepository,
    },
    ui::{AppState, Server},
    usecase::{
        ConnectUserUseCase, CreateRoomUseCase, DisconnectUserUseCase, FanoutResolver,
        ListMessagesUseCase, ListRoomsUseCase, ListUsersUseCase, MarkSeenUseCase,
        OpenConversationUseCase, RoomMembershipUseCase, SendMessageUseCase, TypingUseCase,
    },
};
use idobata_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "idobata-server")]
#[command(about = "Real-time messaging coordinator", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Shared secret for verifying credential tokens
    #[arg(long, env = "IDOBATA_JWT_SECRET", default_value = "idobata-dev-secret")]
    jwt_secret: String,

    /// Typing indicator auto-stop timeout in milliseconds
    #[arg(long, default_value = "1000")]
    typing_ttl_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Repository / Authenticator (collaborators)
    // 2. SessionRegistry / MessagePusher (coordinator state)
    // 3. UseCases
    // 4. AppState
    // 5. Server

    // 1. Create collaborators
    let repository = Arc::new(InMemoryChatRepository::new(Arc::new(SystemClock)));
    let authenticator = Arc::new(JwtAuthenticator::new(&args.jwt_secret));

    // 2. Create coordinator-owned state
    let registry = Arc::new(Mutex::new(SessionRegistry::new()));
    let message_pusher = Arc::new(WebSocketMessagePusher::new());
    let fanout = Arc::new(FanoutResolver::new(repository.clone(), registry.clone()));

    // 3. Create UseCases
    let connect_user_usecase = Arc::new(ConnectUserUseCase::new(
        repository.clone(),
        registry.clone(),
        message_pusher.clone(),
    ));
    let disconnect_user_usecase = Arc::new(DisconnectUserUseCase::new(
        registry.clone(),
        message_pusher.clone(),
    ));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        repository.clone(),
        fanout.clone(),
        message_pusher.clone(),
    ));
    let typing_usecase = Arc::new(TypingUseCase::new(
        fanout.clone(),
        message_pusher.clone(),
        Duration::from_millis(args.typing_ttl_ms),
    ));
    let mark_seen_usecase = Arc::new(MarkSeenUseCase::new(
        repository.clone(),
        fanout.clone(),
        message_pusher.clone(),
    ));
    let room_membership_usecase = Arc::new(RoomMembershipUseCase::new(repository.clone()));
    let open_conversation_usecase = Arc::new(OpenConversationUseCase::new(repository.clone()));
    let create_room_usecase = Arc::new(CreateRoomUseCase::new(repository.clone()));
    let list_rooms_usecase = Arc::new(ListRoomsUseCase::new(repository.clone()));
    let list_messages_usecase = Arc::new(ListMessagesUseCase::new(repository.clone()));
    let list_users_usecase = Arc::new(ListUsersUseCase::new(repository.clone()));

    // 4. Create AppState
    let app_state = AppState {
        authenticator,
        connect_user_usecase,
        disconnect_user_usecase,
        send_message_usecase,
        typing_usecase,
        mark_seen_usecase,
        room_membership_usecase,
        open_conversation_usecase,
        create_room_usecase,
        list_rooms_usecase,
        list_messages_usecase,
        list_users_usecase,
    };

    // 5. Create and run the server
    let server = Server::new(app_state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
