//! Keyroom room server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin keyroom-server
//! cargo run --bin keyroom-server -- --host 0.0.0.0 --port 3000 --room-capacity 16
//! ```

use std::sync::Arc;

use clap::Parser;
use keyroom_server::{
    config::ServerConfig,
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::{AppState, Server},
};
use keyroom_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "keyroom-server")]
#[command(about = "Room server for a shared real-time virtual instrument", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Maximum number of participants per room
    #[arg(long, default_value_t = ServerConfig::default().room_capacity)]
    room_capacity: usize,

    /// Number of chat messages retained per room
    #[arg(long, default_value_t = ServerConfig::default().chat_history)]
    chat_history: usize,

    /// Keep rooms in memory after their last participant leaves
    #[arg(long)]
    keep_empty_rooms: bool,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            room_capacity: args.room_capacity,
            chat_history: args.chat_history,
            reap_empty_rooms: !args.keep_empty_rooms,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let config = ServerConfig::from(&args);
    tracing::debug!("Starting with {:?}", config);

    // 1. Repository (in-memory), 2. MessagePusher, 3. UseCases (AppState), 4. Server
    let repository = Arc::new(InMemoryRoomRepository::new(&config));
    let message_pusher = Arc::new(WebSocketMessagePusher::new());
    let app_state = AppState::new(repository, message_pusher, Arc::new(SystemClock));

    let server = Server::new(app_state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
