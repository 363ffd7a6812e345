//! Keyroom terminal client with reconnection support.
//!
//! Connects to a Keyroom server, joins a room and plays notes from the
//! prompt. Lines starting with `/` are commands (`/note 60 0.8`, `/off 60`,
//! `/pedal 1`, `/move 10 20`, `/name Bob`, `/color #ff8800`, `/join studio`,
//! `/who`, `/quit`); anything else is sent as chat.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin keyroom-client -- --name Alice
//! cargo run --bin keyroom-client -- -n Bob -r studio
//! ```

use std::time::Duration;

use clap::Parser;
use keyroom_client::{ClientOptions, ReconnectPolicy, run_client};
use keyroom_shared::{logger::setup_logger, protocol::RoomSettings};

#[derive(Parser, Debug)]
#[command(name = "keyroom-client")]
#[command(about = "Terminal client for a shared real-time virtual instrument", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Room to join
    #[arg(short = 'r', long, default_value = "lobby")]
    room: String,

    /// Display name requested on handshake
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Consecutive failed connection attempts before giving up
    #[arg(long, default_value_t = 5)]
    max_reconnect_attempts: u32,

    /// Seconds to wait between connection attempts
    #[arg(long, default_value_t = 5)]
    reconnect_interval_secs: u64,

    /// Only the room owner may play (applies when this client creates the room)
    #[arg(long)]
    crown_solo: bool,

    /// Disable chat (applies when this client creates the room)
    #[arg(long)]
    no_chat: bool,

    /// Hide the room from the room list (applies when this client creates the room)
    #[arg(long)]
    hidden: bool,
}

impl Args {
    fn room_settings(&self) -> Option<RoomSettings> {
        if !(self.crown_solo || self.no_chat || self.hidden) {
            return None;
        }
        Some(RoomSettings {
            visible: !self.hidden,
            chat_enabled: !self.no_chat,
            crown_solo_enabled: self.crown_solo,
            ..RoomSettings::default()
        })
    }
}

impl From<Args> for ClientOptions {
    fn from(args: Args) -> Self {
        let room_settings = args.room_settings();
        Self {
            url: args.url,
            room_id: args.room,
            room_settings,
            name: args.name,
            reconnect: ReconnectPolicy {
                max_attempts: args.max_reconnect_attempts,
                interval: Duration::from_secs(args.reconnect_interval_secs),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run_client(ClientOptions::from(args)).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
