//! Client session protocol state machine.
//!
//! `ClientSession` is a pure state value: transport and timer events are fed
//! in through its methods, outbound messages accumulate in an outbox and
//! notifications in an event queue. The connection driver owns the socket
//! and the timers and moves data between them and the session.
//!
//! ```text
//! Disconnected -> Connecting -> Connected(unjoined) -> InRoom
//!       ^              |               |                 |
//!       +--------------+---------------+-----------------+  transport closed
//! ```

use std::mem;

use keyroom_shared::protocol::{
    ChatMessage, DecodeError, Handshake, Identity, InputAction, InputBatch, JoinRoom, Message,
    ParticipantInfo, PresencePatch, PresenceUpdate, RoomSettings, RoomState, TimeSync,
    decode_frame,
};

use crate::{
    batcher::{BatcherConfig, EventBatcher},
    clock::{ClockSyncConfig, ClockSynchronizer},
    command::{Command, SUSTAIN_PEDAL},
    error::ProtocolViolation,
    mirror::{MirrorEvent, ParticipantMirror},
};

/// Color of the placeholder shown for unknown participants.
pub const OFFLINE_PARTICIPANT_COLOR: &str = "#777777";

/// The room this client currently belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomView {
    pub room_id: String,
    pub settings: RoomSettings,
    pub owner_id: Option<String>,
    /// This client's room-scoped participant id.
    pub participant_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// Transport is open; `identity` is set once the handshake reply arrives.
    Connected {
        identity: Option<Identity>,
    },
    InRoom {
        identity: Identity,
        room: RoomView,
    },
}

/// Coarse connection status for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Offline,
    Connecting,
    Online,
}

/// Notification raised by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(ConnectionStatus),
    Identified(Identity),
    /// Entered a room; carries the initial roster.
    Joined {
        room: RoomView,
        roster: Vec<ParticipantInfo>,
    },
    /// Owner or settings of the current room changed.
    RoomUpdated(RoomView),
    Participant(MirrorEvent),
    PresenceUpdated(ParticipantInfo),
    RemoteInput {
        author: ParticipantInfo,
        batch: InputBatch,
    },
    Chat {
        author: ParticipantInfo,
        text: String,
    },
    Roster(Vec<ParticipantInfo>),
    Rejected(ProtocolViolation),
    Disconnected,
}

/// Client half of the session protocol.
#[derive(Debug)]
pub struct ClientSession {
    state: SessionState,
    name: Option<String>,
    /// Room to (re)join as soon as an identity is available.
    desired_room: Option<JoinRoom>,
    connect_attempts: u32,
    transport_opened: bool,
    mirror: ParticipantMirror,
    clock: ClockSynchronizer,
    batcher: EventBatcher,
    outbox: Vec<Message>,
    events: Vec<SessionEvent>,
}

impl ClientSession {
    pub fn new(
        name: Option<String>,
        clock_config: ClockSyncConfig,
        batcher_config: BatcherConfig,
    ) -> Self {
        Self {
            state: SessionState::Disconnected,
            name,
            desired_room: None,
            connect_attempts: 0,
            transport_opened: false,
            mirror: ParticipantMirror::new(),
            clock: ClockSynchronizer::new(clock_config),
            batcher: EventBatcher::new(batcher_config),
            outbox: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        match &self.state {
            SessionState::Disconnected => ConnectionStatus::Offline,
            SessionState::Connecting | SessionState::Connected { identity: None } => {
                ConnectionStatus::Connecting
            }
            SessionState::Connected { identity: Some(_) } | SessionState::InRoom { .. } => {
                ConnectionStatus::Online
            }
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Connected { identity } => identity.as_ref(),
            SessionState::InRoom { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn room(&self) -> Option<&RoomView> {
        match &self.state {
            SessionState::InRoom { room, .. } => Some(room),
            _ => None,
        }
    }

    pub fn mirror(&self) -> &ParticipantMirror {
        &self.mirror
    }

    pub fn clock(&self) -> &ClockSynchronizer {
        &self.clock
    }

    pub fn batcher(&self) -> &EventBatcher {
        &self.batcher
    }

    /// Consecutive connection attempts that never reached the server.
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    /// Settings of the current room, or the offline fallback.
    pub fn settings(&self) -> RoomSettings {
        self.room()
            .map(|room| room.settings.clone())
            .unwrap_or_else(RoomSettings::offline)
    }

    pub fn is_owner(&self) -> bool {
        self.room()
            .is_some_and(|room| room.owner_id.as_deref() == Some(room.participant_id.as_str()))
    }

    /// True when crown solo is on and this client does not hold the crown.
    pub fn prevents_playing(&self) -> bool {
        self.room()
            .is_some_and(|room| room.settings.crown_solo_enabled && !self.is_owner())
    }

    /// Look up a participant, falling back to an offline placeholder.
    pub fn find_participant(&self, participant_id: &str) -> ParticipantInfo {
        self.mirror
            .get(participant_id)
            .cloned()
            .unwrap_or_else(|| ParticipantInfo {
                id: participant_id.to_string(),
                display_name: String::new(),
                color: OFFLINE_PARTICIPANT_COLOR.to_string(),
                x: 0.0,
                y: 0.0,
            })
    }

    /// Take every message queued for the server.
    pub fn take_outbox(&mut self) -> Vec<Message> {
        mem::take(&mut self.outbox)
    }

    /// Take every notification raised since the last call.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        mem::take(&mut self.events)
    }

    pub fn begin_connect(&mut self) {
        if self.state != SessionState::Disconnected {
            return;
        }
        self.state = SessionState::Connecting;
        self.transport_opened = false;
        self.events
            .push(SessionEvent::Status(ConnectionStatus::Connecting));
    }

    /// Transport is up: send the handshake and the first time sample request.
    pub fn on_transport_open(&mut self, local_now: i64) {
        self.state = SessionState::Connected { identity: None };
        self.transport_opened = true;
        self.outbox
            .push(Message::Handshake(Handshake::request(self.name.clone())));
        self.outbox.push(time_sync_request(local_now));
    }

    /// Request membership of `room_id`.
    ///
    /// Before the handshake completes the request is deferred and replayed
    /// once an identity is assigned. It is also replayed after a reconnect.
    pub fn request_join(&mut self, room_id: String, settings: Option<RoomSettings>) {
        let join = JoinRoom { room_id, settings };
        self.desired_room = Some(join.clone());

        if self.identity().is_some() {
            self.outbox.push(Message::JoinRoom(join));
        } else {
            tracing::debug!("Deferring join to '{}' until identified", join.room_id);
        }
    }

    /// Handle one inbound frame.
    ///
    /// # Errors
    ///
    /// Returns the decode error of a malformed frame; nothing was applied.
    pub fn on_frame(&mut self, frame: &str, local_now: i64) -> Result<(), DecodeError> {
        for message in decode_frame(frame)? {
            self.handle_message(message, local_now);
        }
        Ok(())
    }

    fn handle_message(&mut self, message: Message, local_now: i64) {
        match message {
            Message::Handshake(handshake) => self.on_handshake(handshake, local_now),
            Message::TimeSync(TimeSync {
                server_time: Some(server_time),
                ..
            }) => {
                self.clock.receive_server_time(server_time, local_now);
            }
            Message::TimeSync(_) => tracing::debug!("Ignoring timeSync without serverTime"),
            Message::RoomState(state) => self.on_room_state(state),
            Message::PresenceUpdate(update) => self.on_presence_update(update),
            Message::PresenceLeft(left) => {
                if self.room().is_none() {
                    tracing::debug!("Ignoring presenceLeft while not in a room");
                    return;
                }
                let mirror_events = self.mirror.remove(&left.participant_id);
                self.push_mirror_events(mirror_events);
            }
            Message::InputBatch(batch) => self.on_input_batch(batch),
            Message::ChatMessage(chat) => self.on_chat(chat),
            Message::JoinRoom(_) => {
                tracing::warn!("{}", ProtocolViolation::UnexpectedKind("joinRoom"));
            }
        }
    }

    fn on_handshake(&mut self, handshake: Handshake, local_now: i64) {
        let Some(identity) = handshake.identity else {
            tracing::warn!("Ignoring handshake without identity");
            return;
        };
        if let Some(server_time) = handshake.server_time {
            self.clock.receive_server_time(server_time, local_now);
        }

        match &self.state {
            SessionState::Connected { identity: None } => {
                tracing::info!("Identified as {} ({})", identity.display_name, identity.id);
                self.state = SessionState::Connected {
                    identity: Some(identity.clone()),
                };
                self.events.push(SessionEvent::Identified(identity));
                self.events
                    .push(SessionEvent::Status(ConnectionStatus::Online));
                if let Some(join) = self.desired_room.clone() {
                    self.outbox.push(Message::JoinRoom(join));
                }
            }
            SessionState::Connected { identity: Some(_) } | SessionState::InRoom { .. } => {
                tracing::debug!("Ignoring repeated handshake reply");
            }
            _ => tracing::debug!("Ignoring handshake reply while not connected"),
        }
    }

    fn on_room_state(&mut self, state: RoomState) {
        let Some(identity) = self.identity().cloned() else {
            tracing::warn!("Ignoring roomState before handshake");
            return;
        };

        match state.participant_id {
            // Snapshot addressed to this client: room entered or switched.
            Some(participant_id) => {
                let room = RoomView {
                    room_id: state.room_id,
                    settings: state.settings,
                    owner_id: state.owner_id,
                    participant_id,
                };
                tracing::info!("Joined room '{}'", room.room_id);
                let mirror_events = self.mirror.apply_snapshot(&state.roster);
                self.state = SessionState::InRoom {
                    identity,
                    room: room.clone(),
                };
                self.events.push(SessionEvent::Joined {
                    room,
                    roster: state.roster,
                });
                self.push_mirror_events(mirror_events);
            }
            None => {
                let SessionState::InRoom { room, .. } = &mut self.state else {
                    tracing::debug!("Ignoring roomState re-broadcast while not in a room");
                    return;
                };
                if room.room_id != state.room_id {
                    tracing::debug!("Ignoring roomState for stale room '{}'", state.room_id);
                    return;
                }
                room.settings = state.settings;
                room.owner_id = state.owner_id;
                let room = room.clone();
                let mirror_events = self.mirror.apply_snapshot(&state.roster);
                self.events.push(SessionEvent::RoomUpdated(room));
                self.push_mirror_events(mirror_events);
            }
        }
    }

    fn on_presence_update(&mut self, update: PresenceUpdate) {
        if self.room().is_none() {
            tracing::debug!("Ignoring presenceUpdate while not in a room");
            return;
        }
        let mirror_events = self.mirror.apply_patch(&update.participant_id, &update.patch);
        if mirror_events.is_empty() {
            if let Some(participant) = self.mirror.get(&update.participant_id) {
                self.events
                    .push(SessionEvent::PresenceUpdated(participant.clone()));
            }
        } else {
            self.push_mirror_events(mirror_events);
        }
    }

    fn on_input_batch(&mut self, batch: InputBatch) {
        if self.room().is_none() {
            tracing::debug!("Ignoring inputBatch while not in a room");
            return;
        }
        let author = batch
            .participant_id
            .as_deref()
            .map(|id| self.find_participant(id))
            .unwrap_or_else(|| self.find_participant(""));
        self.events.push(SessionEvent::RemoteInput { author, batch });
    }

    fn on_chat(&mut self, chat: ChatMessage) {
        if self.room().is_none() {
            tracing::debug!("Ignoring chatMessage while not in a room");
            return;
        }
        let author = self.find_participant(chat.author_id.as_deref().unwrap_or_default());
        self.events.push(SessionEvent::Chat {
            author,
            text: chat.text,
        });
    }

    /// Record a local input event on the shared timeline.
    ///
    /// # Errors
    ///
    /// Input is refused while offline, outside a room and while crown solo
    /// reserves the instrument for the owner.
    pub fn record_input(
        &mut self,
        action: InputAction,
        local_now: i64,
    ) -> Result<(), ProtocolViolation> {
        self.require_room()?;
        if self.prevents_playing() {
            return Err(ProtocolViolation::InputNotPermitted);
        }
        let shared_now = self.clock.shared_now(local_now);
        self.batcher.record(action, shared_now);
        Ok(())
    }

    fn require_room(&self) -> Result<&RoomView, ProtocolViolation> {
        match &self.state {
            SessionState::InRoom { room, .. } => Ok(room),
            SessionState::Connected { .. } => Err(ProtocolViolation::NotInRoom),
            SessionState::Disconnected | SessionState::Connecting => {
                Err(ProtocolViolation::NotConnected)
            }
        }
    }

    /// Flush timer tick: queue the open batch if it holds any events.
    pub fn flush_input(&mut self) {
        if let Some(batch) = self.batcher.flush() {
            self.outbox.push(Message::InputBatch(batch));
        }
    }

    /// Sync timer tick: request a new time sample.
    pub fn sync_tick(&mut self, local_now: i64) {
        if matches!(
            self.state,
            SessionState::Connected { .. } | SessionState::InRoom { .. }
        ) {
            self.outbox.push(time_sync_request(local_now));
        }
    }

    /// Smoothing timer tick.
    pub fn smoothing_tick(&mut self) -> Option<f64> {
        self.clock.step()
    }

    /// Send a sparse presence patch for this client.
    ///
    /// The mirror is updated when the server echoes the sanitized patch.
    pub fn update_presence(&mut self, patch: PresencePatch) -> Result<(), ProtocolViolation> {
        let room = self.require_room()?;
        let update = PresenceUpdate {
            participant_id: room.participant_id.clone(),
            patch,
        };
        self.outbox.push(Message::PresenceUpdate(update));
        Ok(())
    }

    pub fn send_chat(&mut self, text: String) -> Result<(), ProtocolViolation> {
        let room = self.require_room()?;
        if !room.settings.chat_enabled {
            return Err(ProtocolViolation::ChatDisabled);
        }
        self.outbox.push(Message::ChatMessage(ChatMessage {
            author_id: None,
            text,
        }));
        Ok(())
    }

    /// Execute a prompt command. `Quit` is handled by the caller.
    pub fn execute(&mut self, command: Command, local_now: i64) -> Result<(), ProtocolViolation> {
        match command {
            Command::Note { note, velocity } => self.record_input(
                InputAction::NoteOn {
                    note,
                    velocity: Some(velocity),
                },
                local_now,
            ),
            Command::Off { note } => self.record_input(InputAction::NoteOff { note }, local_now),
            Command::Pedal { value } => self.record_input(
                InputAction::Control {
                    controller: SUSTAIN_PEDAL,
                    value,
                },
                local_now,
            ),
            Command::Move { x, y } => self.update_presence(PresencePatch {
                x: Some(x),
                y: Some(y),
                ..PresencePatch::default()
            }),
            Command::Name(name) => {
                self.name = Some(name.clone());
                self.update_presence(PresencePatch {
                    display_name: Some(name),
                    ..PresencePatch::default()
                })
            }
            Command::Color(color) => self.update_presence(PresencePatch {
                color: Some(color),
                ..PresencePatch::default()
            }),
            Command::Join(room_id) => {
                self.request_join(room_id, None);
                Ok(())
            }
            Command::Who => {
                self.events.push(SessionEvent::Roster(
                    self.mirror.participants().cloned().collect(),
                ));
                Ok(())
            }
            Command::Chat(text) => self.send_chat(text),
            Command::Quit => Ok(()),
        }
    }

    /// The transport closed, from any state.
    ///
    /// Clears the mirror, pending input and clock state and raises
    /// `Disconnected` once; further calls are no-ops until the next connect.
    pub fn on_transport_closed(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }

        if self.transport_opened {
            self.connect_attempts = 0;
        } else {
            self.connect_attempts += 1;
        }
        self.transport_opened = false;
        self.state = SessionState::Disconnected;

        let mirror_events = self.mirror.clear();
        self.push_mirror_events(mirror_events);
        self.clock.reset();
        self.batcher.clear();
        self.outbox.clear();

        self.events
            .push(SessionEvent::Status(ConnectionStatus::Offline));
        self.events.push(SessionEvent::Disconnected);
    }

    fn push_mirror_events(&mut self, events: Vec<MirrorEvent>) {
        self.events
            .extend(events.into_iter().map(SessionEvent::Participant));
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new(None, ClockSyncConfig::default(), BatcherConfig::default())
    }
}

fn time_sync_request(local_now: i64) -> Message {
    Message::TimeSync(TimeSync {
        client_time: Some(local_now as f64),
        server_time: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connected_session() -> ClientSession {
        let mut session = ClientSession::new(
            Some("Alice".to_string()),
            ClockSyncConfig::default(),
            BatcherConfig::default(),
        );
        session.begin_connect();
        session.on_transport_open(0);
        session
    }

    fn handshake_frame(id: &str, server_time: f64) -> String {
        json!({
            "kind": "handshake",
            "identity": {"id": id, "displayName": "Alice", "color": "#abcdef"},
            "serverTime": server_time
        })
        .to_string()
    }

    fn room_state_frame(owner: &str, me: Option<&str>, crown_solo: bool) -> String {
        let mut frame = json!({
            "kind": "roomState",
            "roomId": "lobby",
            "settings": {"crownSoloEnabled": crown_solo},
            "ownerId": owner,
            "roster": [
                {"id": "A", "displayName": "Alice", "color": "#abcdef", "x": 0, "y": 0},
                {"id": "B", "displayName": "Bob", "color": "#123456", "x": 1, "y": 1}
            ]
        });
        if let Some(me) = me {
            frame["participantId"] = json!(me);
        }
        frame.to_string()
    }

    fn in_room_session(me: &str, owner: &str, crown_solo: bool) -> ClientSession {
        let mut session = connected_session();
        session.on_frame(&handshake_frame(me, 1000.0), 0).unwrap();
        session.request_join("lobby".to_string(), None);
        session
            .on_frame(&room_state_frame(owner, Some(me), crown_solo), 0)
            .unwrap();
        session.take_outbox();
        session.take_events();
        session
    }

    #[test]
    fn test_transport_open_sends_handshake_and_time_sync() {
        // テスト項目: 接続直後にハンドシェイクと timeSync が送信される
        // given (前提条件):
        let mut session = ClientSession::new(
            Some("Alice".to_string()),
            ClockSyncConfig::default(),
            BatcherConfig::default(),
        );

        // when (操作):
        session.begin_connect();
        let connecting = session.status();
        session.on_transport_open(42);

        // then (期待する結果):
        assert_eq!(connecting, ConnectionStatus::Connecting);
        assert_eq!(
            session.take_outbox(),
            vec![
                Message::Handshake(Handshake::request(Some("Alice".to_string()))),
                Message::TimeSync(TimeSync {
                    client_time: Some(42.0),
                    server_time: None
                }),
            ]
        );
    }

    #[test]
    fn test_join_before_handshake_is_deferred_and_replayed() {
        // テスト項目: ハンドシェイク前の入室要求は保留され、Identity 受信後に送られる
        // given (前提条件):
        let mut session = connected_session();
        session.take_outbox();

        // when (操作):
        session.request_join("lobby".to_string(), None);
        let before = session.take_outbox();
        session.on_frame(&handshake_frame("A", 1000.0), 0).unwrap();
        let after = session.take_outbox();

        // then (期待する結果):
        assert!(before.is_empty());
        assert_eq!(
            after,
            vec![Message::JoinRoom(JoinRoom {
                room_id: "lobby".to_string(),
                settings: None
            })]
        );
        assert_eq!(session.status(), ConnectionStatus::Online);
    }

    #[test]
    fn test_join_scenario_mirror_contains_owner() {
        // テスト項目: handshake → joinRoom → roomState でミラーにオーナーの A だけが入る
        // given (前提条件):
        let mut session = connected_session();
        session.on_frame(&handshake_frame("A", 1000.0), 0).unwrap();
        session.request_join("lobby".to_string(), None);

        // when (操作):
        let frame = json!({
            "kind": "roomState",
            "roomId": "lobby",
            "settings": {},
            "ownerId": "A",
            "participantId": "A",
            "roster": [{"id": "A", "displayName": "Alice", "color": "#abcdef", "x": 0, "y": 0}]
        });
        session.on_frame(&frame.to_string(), 0).unwrap();

        // then (期待する結果):
        let room = session.room().unwrap();
        assert_eq!(room.room_id, "lobby");
        assert_eq!(room.owner_id.as_deref(), Some("A"));
        assert!(session.is_owner());
        let ids: Vec<&str> = session
            .mirror()
            .participants()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["A"]);
        assert_eq!(session.clock().smoothed_offset(), 1000.0);
    }

    #[test]
    fn test_sparse_presence_updates_scenario() {
        // テスト項目: x だけ、color だけの presenceUpdate を受けても名前は変わらない
        // given (前提条件):
        let mut session = in_room_session("A", "A", false);

        // when (操作):
        let frame = json!([
            {"kind": "presenceUpdate", "participantId": "A", "x": 5},
            {"kind": "presenceUpdate", "participantId": "A", "color": "#fff"}
        ]);
        session.on_frame(&frame.to_string(), 0).unwrap();

        // then (期待する結果):
        let alice = session.mirror().get("A").unwrap();
        assert_eq!(alice.x, 5.0);
        assert_eq!(alice.color, "#fff");
        assert_eq!(alice.display_name, "Alice");
        assert_eq!(session.take_events().len(), 2);
    }

    #[test]
    fn test_owner_rebroadcast_updates_crown() {
        // テスト項目: participantId のない roomState でオーナーが更新され、退出者がミラーから消える
        // given (前提条件):
        let mut session = in_room_session("B", "A", true);
        assert!(session.prevents_playing());

        // when (操作):
        let frame = json!([
            {"kind": "presenceLeft", "participantId": "A"},
            {
                "kind": "roomState",
                "roomId": "lobby",
                "settings": {"crownSoloEnabled": true},
                "ownerId": "B",
                "roster": [{"id": "B", "displayName": "Bob", "color": "#123456", "x": 1, "y": 1}]
            }
        ]);
        session.on_frame(&frame.to_string(), 0).unwrap();

        // then (期待する結果):
        assert!(session.is_owner());
        assert!(!session.prevents_playing());
        assert!(session.mirror().get("A").is_none());
        let events = session.take_events();
        assert!(events.contains(&SessionEvent::Participant(MirrorEvent::Count(1))));
        assert!(matches!(events.last(), Some(SessionEvent::RoomUpdated(_))));
    }

    #[test]
    fn test_crown_solo_refuses_non_owner_input() {
        // テスト項目: crown solo 中はオーナー以外の入力が拒否される
        // given (前提条件):
        let mut session = in_room_session("B", "A", true);

        // when (操作):
        let result = session.record_input(InputAction::NoteOff { note: 60 }, 0);

        // then (期待する結果):
        assert_eq!(result, Err(ProtocolViolation::InputNotPermitted));
        assert!(session.batcher().is_empty());
    }

    #[test]
    fn test_recorded_input_is_flushed_on_shared_timeline() {
        // テスト項目: 入力は共有タイムライン上の時刻で 1 つのバッチにまとめて送信される
        // given (前提条件):
        let mut session = in_room_session("A", "A", false);

        // when (操作):
        session
            .execute(
                Command::Note {
                    note: 60,
                    velocity: 0.5,
                },
                5_000,
            )
            .unwrap();
        session.execute(Command::Off { note: 60 }, 5_120).unwrap();
        session.flush_input();
        session.flush_input();

        // then (期待する結果):
        let outbox = session.take_outbox();
        assert_eq!(outbox.len(), 1);
        let Message::InputBatch(batch) = &outbox[0] else {
            panic!("expected inputBatch");
        };
        // smoothed offset 1000 (handshake serverTime 1000 at local 0)
        assert_eq!(batch.anchor_time, 6_000.0);
        assert_eq!(batch.events[1].delta_ms, 120.0);
    }

    #[test]
    fn test_input_outside_room_is_refused() {
        // テスト項目: 入室前の入力は NotInRoom で拒否される
        // given (前提条件):
        let mut session = connected_session();

        // when (操作):
        let result = session.execute(Command::Pedal { value: 1.0 }, 0);

        // then (期待する結果):
        assert_eq!(result, Err(ProtocolViolation::NotInRoom));
    }

    #[test]
    fn test_input_while_offline_is_refused_as_not_connected() {
        // テスト項目: オフライン中の演奏・プレゼンス・チャットは NotConnected で拒否され、何も送信されない
        // given (前提条件):
        let mut session = ClientSession::default();

        // when (操作):
        let note = session.execute(
            Command::Note {
                note: 60,
                velocity: 0.5,
            },
            0,
        );
        let moved = session.execute(Command::Move { x: 1.0, y: 2.0 }, 0);
        let chat = session.execute(Command::Chat("hi".to_string()), 0);

        // then (期待する結果):
        assert_eq!(note, Err(ProtocolViolation::NotConnected));
        assert_eq!(moved, Err(ProtocolViolation::NotConnected));
        assert_eq!(chat, Err(ProtocolViolation::NotConnected));
        assert!(session.batcher().is_empty());
        assert!(session.take_outbox().is_empty());
    }

    #[test]
    fn test_presence_command_is_not_applied_locally() {
        // テスト項目: 自分のプレゼンス変更は送信のみで、ミラーはサーバーのエコーで更新される
        // given (前提条件):
        let mut session = in_room_session("A", "A", false);

        // when (操作):
        session
            .execute(Command::Move { x: 3.0, y: 4.0 }, 0)
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            session.take_outbox(),
            vec![Message::PresenceUpdate(PresenceUpdate {
                participant_id: "A".to_string(),
                patch: PresencePatch {
                    x: Some(3.0),
                    y: Some(4.0),
                    ..PresencePatch::default()
                }
            })]
        );
        assert_eq!(session.mirror().get("A").unwrap().x, 0.0);
    }

    #[test]
    fn test_chat_disabled_is_refused() {
        // テスト項目: チャットが無効な Room ではチャット送信が拒否される
        // given (前提条件):
        let mut session = connected_session();
        session.on_frame(&handshake_frame("A", 0.0), 0).unwrap();
        session.request_join("quiet".to_string(), None);
        let frame = json!({
            "kind": "roomState",
            "roomId": "quiet",
            "settings": {"chatEnabled": false},
            "ownerId": "A",
            "participantId": "A",
            "roster": []
        });
        session.on_frame(&frame.to_string(), 0).unwrap();

        // when (操作):
        let result = session.send_chat("hello".to_string());

        // then (期待する結果):
        assert_eq!(result, Err(ProtocolViolation::ChatDisabled));
    }

    #[test]
    fn test_remote_chat_and_input_carry_author() {
        // テスト項目: 受信したチャットと入力には送信者の情報が付く（未知の送信者は代替表示）
        // given (前提条件):
        let mut session = in_room_session("A", "A", false);

        // when (操作):
        let frame = json!([
            {"kind": "chatMessage", "authorId": "B", "text": "hi"},
            {"kind": "inputBatch", "participantId": "ghost", "anchorTime": 1, "events": []}
        ]);
        session.on_frame(&frame.to_string(), 0).unwrap();

        // then (期待する結果):
        let events = session.take_events();
        let SessionEvent::Chat { author, text } = &events[0] else {
            panic!("expected chat event");
        };
        assert_eq!(author.display_name, "Bob");
        assert_eq!(text, "hi");
        let SessionEvent::RemoteInput { author, .. } = &events[1] else {
            panic!("expected remote input event");
        };
        assert_eq!(author.color, OFFLINE_PARTICIPANT_COLOR);
    }

    #[test]
    fn test_malformed_frame_changes_nothing() {
        // テスト項目: 不正なフレームはエラーを返し、状態は変わらない
        // given (前提条件):
        let mut session = in_room_session("A", "A", false);

        // when (操作):
        let result = session.on_frame("{not json", 0);

        // then (期待する結果):
        assert!(result.is_err());
        assert_eq!(session.mirror().len(), 2);
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn test_transport_close_clears_state_exactly_once() {
        // テスト項目: 切断で状態がクリアされ、切断通知はちょうど 1 回だけ出る
        // given (前提条件):
        let mut session = in_room_session("A", "A", false);
        session.on_frame(r#"{"kind":"timeSync","serverTime":5000}"#, 0).unwrap();
        session.record_input(InputAction::NoteOff { note: 1 }, 0).unwrap();
        assert!(session.clock().is_smoothing());

        // when (操作):
        session.on_transport_closed();
        session.on_transport_closed();

        // then (期待する結果):
        let events = session.take_events();
        let disconnects = events
            .iter()
            .filter(|e| **e == SessionEvent::Disconnected)
            .count();
        assert_eq!(disconnects, 1);
        assert!(session.mirror().is_empty());
        assert!(session.batcher().is_empty());
        assert!(!session.clock().is_smoothing());
        assert_eq!(session.settings(), RoomSettings::offline());
        assert_eq!(session.status(), ConnectionStatus::Offline);
        assert!(session.take_outbox().is_empty());
    }

    #[test]
    fn test_connect_attempts_count_failures_and_reset_after_session() {
        // テスト項目: 接続失敗で試行回数が増え、接続できたセッションの終了でリセットされる
        // given (前提条件):
        let mut session = ClientSession::default();

        // when (操作):
        session.begin_connect();
        session.on_transport_closed();
        session.begin_connect();
        session.on_transport_closed();
        let after_failures = session.connect_attempts();
        session.begin_connect();
        session.on_transport_open(0);
        session.on_transport_closed();

        // then (期待する結果):
        assert_eq!(after_failures, 2);
        assert_eq!(session.connect_attempts(), 0);
    }

    #[test]
    fn test_reconnect_replays_desired_room() {
        // テスト項目: 再接続後のハンドシェイクで以前の Room に自動で入り直す
        // given (前提条件):
        let mut session = in_room_session("A", "A", false);
        session.on_transport_closed();

        // when (操作):
        session.begin_connect();
        session.on_transport_open(0);
        session.take_outbox();
        session.on_frame(&handshake_frame("A2", 0.0), 0).unwrap();

        // then (期待する結果):
        assert_eq!(
            session.take_outbox(),
            vec![Message::JoinRoom(JoinRoom {
                room_id: "lobby".to_string(),
                settings: None
            })]
        );
    }
}
