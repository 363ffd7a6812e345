//! Integration tests for the Keyroom server, driven over real sockets.
//!
//! The server runs in-process on an ephemeral port; clients are plain
//! `tokio-tungstenite` connections speaking the JSON frame protocol.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use keyroom_server::{
    config::ServerConfig,
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::{AppState, Server},
};
use keyroom_shared::{
    protocol::{Message, decode_frame},
    time::SystemClock,
};
use serde_json::{Value, json};
use tokio::{net::TcpStream, task::JoinHandle, time::timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};

/// Helper struct to manage the in-process server lifecycle
struct TestServer {
    handle: JoinHandle<()>,
    port: u16,
}

impl TestServer {
    async fn start(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = AppState::new(
            Arc::new(InMemoryRoomRepository::new(&config)),
            Arc::new(WebSocketMessagePusher::new()),
            Arc::new(SystemClock),
        );
        let handle = tokio::spawn(async move {
            let _ = Server::new(state)
                .serve(listener, std::future::pending())
                .await;
        });
        TestServer { handle, port }
    }

    fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Helper struct for one WebSocket client
struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<Message>,
}

impl TestClient {
    async fn connect(server: &TestServer) -> Self {
        let (stream, _) = connect_async(server.ws_url()).await.unwrap();
        TestClient {
            stream,
            pending: VecDeque::new(),
        }
    }

    async fn send(&mut self, frame: Value) {
        self.stream
            .send(WsMessage::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    /// Receive the next decoded message, buffering the rest of a multi-message frame
    async fn recv(&mut self) -> Message {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return message;
            }
            let frame = timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream ended")
                .unwrap();
            if let WsMessage::Text(text) = frame {
                self.pending.extend(decode_frame(text.as_str()).unwrap());
            }
        }
    }

    /// Assert that nothing arrives within a short window
    async fn expect_silence(&mut self) {
        assert!(self.pending.is_empty(), "unexpected message: {:?}", self.pending);
        let result = timeout(Duration::from_millis(200), self.stream.next()).await;
        assert!(result.is_err(), "unexpected frame: {:?}", result);
    }

    /// handshake + joinRoom; returns this client's participant id
    async fn join(&mut self, name: &str, room: &str) -> String {
        self.send(json!({"kind": "handshake", "name": name})).await;
        let Message::Handshake(_) = self.recv().await else {
            panic!("expected handshake reply");
        };
        self.send(json!({"kind": "joinRoom", "roomId": room})).await;
        match self.recv().await {
            Message::RoomState(state) => state.participant_id.unwrap(),
            other => panic!("expected roomState, got {:?}", other),
        }
    }

    async fn close(mut self) {
        self.stream.close(None).await.unwrap();
    }
}

#[tokio::test]
async fn test_handshake_issues_identity_and_server_time() {
    // テスト項目: ハンドシェイクで Identity とサーバー時刻が返る
    // given (前提条件):
    let server = TestServer::start(ServerConfig::default()).await;
    let mut client = TestClient::connect(&server).await;

    // when (操作):
    client
        .send(json!({"kind": "handshake", "name": "Alice"}))
        .await;

    // then (期待する結果):
    let Message::Handshake(reply) = client.recv().await else {
        panic!("expected handshake reply");
    };
    let identity = reply.identity.unwrap();
    assert_eq!(identity.display_name, "Alice");
    assert!(identity.color.starts_with('#'));
    assert!(reply.server_time.unwrap() > 0.0);
}

#[tokio::test]
async fn test_join_snapshot_and_presence_flow() {
    // テスト項目: 入室・疎なプレゼンス更新・退出が全メンバーに反映される
    // given (前提条件):
    let server = TestServer::start(ServerConfig::default()).await;
    let mut alice = TestClient::connect(&server).await;
    let alice_id = alice.join("Alice", "lobby").await;
    let mut bob = TestClient::connect(&server).await;
    let bob_id = bob.join("Bob", "lobby").await;

    // then: Alice には Bob の入室が全フィールドの presenceUpdate で届く
    let Message::PresenceUpdate(joined) = alice.recv().await else {
        panic!("expected presenceUpdate");
    };
    assert_eq!(joined.participant_id, bob_id);
    assert_eq!(joined.patch.display_name.as_deref(), Some("Bob"));

    // when (操作): Bob がカーソル位置だけを送る
    bob.send(json!({"kind": "presenceUpdate", "participantId": bob_id, "x": 5}))
        .await;

    // then (期待する結果): 位置だけのパッチが両方に届く
    for client in [&mut alice, &mut bob] {
        let Message::PresenceUpdate(update) = client.recv().await else {
            panic!("expected presenceUpdate");
        };
        assert_eq!(update.patch.x, Some(5.0));
        assert_eq!(update.patch.display_name, None);
    }

    // when (操作): オーナーの Alice が切断する
    alice.close().await;

    // then (期待する結果): presenceLeft と、Bob がオーナーの roomState が届く
    let Message::PresenceLeft(left) = bob.recv().await else {
        panic!("expected presenceLeft");
    };
    assert_eq!(left.participant_id, alice_id);
    let Message::RoomState(state) = bob.recv().await else {
        panic!("expected roomState");
    };
    assert_eq!(state.owner_id, Some(bob_id));
}

#[tokio::test]
async fn test_input_batch_relay_preserves_timing() {
    // テスト項目: 入力バッチはタイミング情報をそのままに他のメンバーへ中継される
    // given (前提条件):
    let server = TestServer::start(ServerConfig::default()).await;
    let mut alice = TestClient::connect(&server).await;
    alice.join("Alice", "lobby").await;
    let mut bob = TestClient::connect(&server).await;
    let bob_id = bob.join("Bob", "lobby").await;
    alice.recv().await; // Bob の入室通知

    // when (操作):
    bob.send(json!([{
        "kind": "inputBatch",
        "anchorTime": 123456.5,
        "events": [
            {"deltaMs": 0, "action": "noteOn", "note": 60, "velocity": 0.5},
            {"deltaMs": 25, "action": "noteOff", "note": 60}
        ]
    }]))
    .await;

    // then (期待する結果):
    let Message::InputBatch(batch) = alice.recv().await else {
        panic!("expected inputBatch");
    };
    assert_eq!(batch.participant_id, Some(bob_id));
    assert_eq!(batch.anchor_time, 123456.5);
    let deltas: Vec<f64> = batch.events.iter().map(|e| e.delta_ms).collect();
    assert_eq!(deltas, vec![0.0, 25.0]);
    bob.expect_silence().await;
}

#[tokio::test]
async fn test_malformed_frame_does_not_close_connection() {
    // テスト項目: 不正なフレームを送っても接続は維持される
    // given (前提条件):
    let server = TestServer::start(ServerConfig::default()).await;
    let mut client = TestClient::connect(&server).await;

    // when (操作):
    client
        .stream
        .send(WsMessage::Text("not json".into()))
        .await
        .unwrap();
    client
        .send(json!({"kind": "timeSync", "clientTime": 7}))
        .await;

    // then (期待する結果):
    let Message::TimeSync(sync) = client.recv().await else {
        panic!("expected timeSync");
    };
    assert_eq!(sync.client_time, Some(7.0));
    assert!(sync.server_time.is_some());
}

#[tokio::test]
async fn test_http_health_and_rooms() {
    // テスト項目: HTTP API でヘルスチェックと Room 一覧・詳細が取得できる
    // given (前提条件):
    let server = TestServer::start(ServerConfig::default()).await;
    let mut client = TestClient::connect(&server).await;
    let participant_id = client.join("Alice", "lobby").await;
    let http = reqwest::Client::new();

    // when (操作):
    let health: Value = http
        .get(server.http_url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rooms: Value = http
        .get(server.http_url("/api/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let detail: Value = http
        .get(server.http_url("/api/rooms/lobby"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let missing = http
        .get(server.http_url("/api/rooms/nowhere"))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(health, json!({"status": "ok"}));
    assert_eq!(rooms[0]["id"], "lobby");
    assert_eq!(rooms[0]["participantCount"], 1);
    assert_eq!(detail["ownerId"], participant_id);
    assert_eq!(detail["participants"][0]["displayName"], "Alice");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
