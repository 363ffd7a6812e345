//! UI 層: HTTP / WebSocket エンドポイントと接続ごとのセッション

mod handler;
mod server;
pub mod session;
mod signal;
pub mod state;

pub use server::Server;
pub use session::ServerSession;
pub use state::AppState;
