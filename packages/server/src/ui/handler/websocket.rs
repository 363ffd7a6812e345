//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::mpsc;

use crate::ui::{session::ServerSession, state::AppState};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns the task that forwards frames queued for this connection to its socket.
///
/// Frames come from this connection's own replies and from broadcasts by other
/// connections (through the `MessagePusher`).
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut send_task = pusher_loop(rx, sender);
    let mut session = ServerSession::new(state, tx);
    tracing::debug!("WebSocket connection opened");

    // 受信したフレームはこのループで 1 つずつ処理する（接続ごとに直列）
    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => session.handle_frame(text.as_str()).await,
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!("Dropping binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("Client closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            _ = &mut send_task => {
                tracing::debug!("Outbound stream ended");
                break;
            }
        }
    }

    send_task.abort();
    session.close().await;
}
