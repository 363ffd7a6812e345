//! Per-connection session (server side of the session protocol).
//!
//! A session starts `Connected`, becomes `Identified` after the handshake and
//! `InRoom` once a join is admitted. Every inbound frame of the connection is
//! handled here in arrival order. Frames addressed to this connection are
//! written to its own outbound channel; frames for other members go through
//! the use cases' `MessagePusher`.

use std::sync::Arc;

use keyroom_shared::protocol::{
    ChatMessage, Handshake, InputBatch, JoinRoom, Message, PresenceLeft, PresenceUpdate,
    TimeSync, decode_frame, encode_frame, encode_message,
};

use crate::{
    domain::{
        Identity, Membership, Participant, ParticipantPatch, PusherChannel, Removal, Room,
        Timestamp,
    },
    infrastructure::dto::conversion::{presence_joined, presence_update, room_state},
    usecase::{ProtocolViolation, SendChatError},
};

use super::state::AppState;

/// Lifecycle of one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Transport is open, no handshake yet.
    Connected,
    /// Identity issued, not in any room.
    Identified { identity: Identity },
    /// Admitted into a room.
    InRoom {
        identity: Identity,
        membership: Membership,
    },
}

impl SessionPhase {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionPhase::Connected => None,
            SessionPhase::Identified { identity } | SessionPhase::InRoom { identity, .. } => {
                Some(identity)
            }
        }
    }

    pub fn membership(&self) -> Option<&Membership> {
        match self {
            SessionPhase::InRoom { membership, .. } => Some(membership),
            _ => None,
        }
    }
}

/// Server side session of one WebSocket connection.
pub struct ServerSession {
    state: Arc<AppState>,
    outbound: PusherChannel,
    phase: SessionPhase,
}

impl ServerSession {
    pub fn new(state: Arc<AppState>, outbound: PusherChannel) -> Self {
        Self {
            state,
            outbound,
            phase: SessionPhase::Connected,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.state.clock.now_millis())
    }

    /// Handle one inbound text frame.
    ///
    /// Malformed frames and messages that are invalid in the current phase are
    /// logged and dropped; the connection stays open.
    pub async fn handle_frame(&mut self, frame: &str) {
        let messages = match decode_frame(frame) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        for message in messages {
            let kind = message.kind();
            if let Err(violation) = self.handle_message(message).await {
                tracing::warn!("Dropping '{}': {}", kind, violation);
            }
        }
    }

    async fn handle_message(&mut self, message: Message) -> Result<(), ProtocolViolation> {
        match message {
            Message::Handshake(handshake) => {
                self.on_handshake(handshake).await;
                Ok(())
            }
            Message::TimeSync(sync) => {
                self.on_time_sync(sync);
                Ok(())
            }
            Message::JoinRoom(join) => self.on_join_room(join).await,
            Message::PresenceUpdate(update) => self.on_presence_update(update).await,
            Message::InputBatch(batch) => self.on_input_batch(batch).await,
            Message::ChatMessage(chat) => self.on_chat(chat).await,
            Message::RoomState(_) | Message::PresenceLeft(_) => {
                Err(ProtocolViolation::UnexpectedKind(message.kind()))
            }
        }
    }

    async fn on_handshake(&mut self, handshake: Handshake) {
        // 2 回目以降のハンドシェイクには発行済みの Identity を返す
        let identity = match self.phase.identity() {
            Some(identity) => identity.clone(),
            None => {
                let identity = self
                    .state
                    .connect_participant_usecase
                    .execute(handshake.name, self.outbound.clone())
                    .await;
                self.phase = SessionPhase::Identified {
                    identity: identity.clone(),
                };
                identity
            }
        };

        let reply = Handshake::reply((&identity).into(), self.now().value() as f64);
        self.reply(Message::Handshake(reply));
    }

    fn on_time_sync(&self, sync: TimeSync) {
        let reply = TimeSync {
            client_time: sync.client_time,
            server_time: Some(self.now().value() as f64),
        };
        self.reply(Message::TimeSync(reply));
    }

    async fn on_join_room(&mut self, join: JoinRoom) -> Result<(), ProtocolViolation> {
        let identity = self
            .phase
            .identity()
            .cloned()
            .ok_or(ProtocolViolation::NotIdentified("joinRoom"))?;
        let current = self.phase.membership().cloned();
        let outbound = &self.outbound;

        if let Some(current) = current.as_ref().filter(|c| c.room_id.as_str() == join.room_id) {
            // 同じ Room への再入室はスナップショットを送り直すだけ
            let resent = self
                .state
                .join_room_usecase
                .resend_snapshot(
                    current,
                    Box::new(move |room, me| send_snapshot(outbound, room, me)),
                )
                .await;
            if resent {
                return Ok(());
            }
        }

        // 元の Room からは、新しい Room への入室が確定してから退出する
        let settings = join.settings.map(Into::into);
        let admission = match self
            .state
            .join_room_usecase
            .execute(
                &identity,
                join.room_id,
                settings,
                self.now(),
                Box::new(move |room, me| send_snapshot(outbound, room, me)),
            )
            .await
        {
            Ok(admission) => admission,
            Err(e) => {
                tracing::warn!("Join refused for '{}': {}", identity.id.as_str(), e);
                return Ok(());
            }
        };

        if let Some(previous) = current.filter(|c| c.room_id != admission.room.id) {
            self.leave(&previous).await;
        }

        if let Some(frame) = encode(&[Message::PresenceUpdate(presence_joined(
            &admission.participant,
        ))]) {
            if let Err(e) = self
                .state
                .join_room_usecase
                .broadcast_joined(&admission, &frame)
                .await
            {
                tracing::warn!("Failed to broadcast join: {}", e);
            }
        }

        self.phase = SessionPhase::InRoom {
            identity,
            membership: Membership {
                room_id: admission.room.id.clone(),
                participant_id: admission.participant.id.clone(),
            },
        };
        Ok(())
    }

    async fn leave(&self, membership: &Membership) {
        let usecase = &self.state.leave_room_usecase;
        let Some(removal) = usecase.execute(membership).await else {
            return;
        };
        if let Some(frame) = encode(&departure_messages(&removal)) {
            if let Err(e) = usecase.broadcast_left(&removal, &frame).await {
                tracing::warn!("Failed to broadcast presenceLeft: {}", e);
            }
        }
    }

    fn require_membership(&self, kind: &'static str) -> Result<Membership, ProtocolViolation> {
        match &self.phase {
            SessionPhase::Connected => Err(ProtocolViolation::NotIdentified(kind)),
            SessionPhase::Identified { .. } => Err(ProtocolViolation::NotInRoom(kind)),
            SessionPhase::InRoom { membership, .. } => Ok(membership.clone()),
        }
    }

    async fn on_presence_update(&mut self, update: PresenceUpdate) -> Result<(), ProtocolViolation> {
        let membership = self.require_membership("presenceUpdate")?;
        let patch = ParticipantPatch::from(&update.patch);

        let Some(change) = self
            .state
            .update_presence_usecase
            .execute(&membership, &patch)
            .await
        else {
            return Ok(());
        };

        let message = Message::PresenceUpdate(presence_update(&change.participant.id, &patch));
        if let Some(frame) = encode(&[message]) {
            if let Err(e) = self
                .state
                .update_presence_usecase
                .broadcast(change.targets, &frame)
                .await
            {
                tracing::warn!("Failed to broadcast presenceUpdate: {}", e);
            }
        }
        Ok(())
    }

    async fn on_input_batch(&mut self, batch: InputBatch) -> Result<(), ProtocolViolation> {
        let membership = self.require_membership("inputBatch")?;
        if batch.events.is_empty() {
            tracing::debug!("Ignoring empty inputBatch");
            return Ok(());
        }

        let Some(targets) = self.state.relay_input_usecase.execute(&membership).await? else {
            return Ok(());
        };

        let relayed = InputBatch {
            participant_id: Some(membership.participant_id.as_str().to_string()),
            ..batch
        };
        if let Some(frame) = encode(&[Message::InputBatch(relayed)]) {
            if let Err(e) = self
                .state
                .relay_input_usecase
                .broadcast(targets, &frame)
                .await
            {
                tracing::warn!("Failed to relay inputBatch: {}", e);
            }
        }
        Ok(())
    }

    async fn on_chat(&mut self, chat: ChatMessage) -> Result<(), ProtocolViolation> {
        let membership = self.require_membership("chatMessage")?;

        let delivery = match self
            .state
            .send_chat_usecase
            .execute(&membership, chat.text, self.now())
            .await
        {
            Ok(Some(delivery)) => delivery,
            Ok(None) => return Ok(()),
            Err(SendChatError::Violation(violation)) => return Err(violation),
            Err(SendChatError::InvalidText(e)) => {
                tracing::debug!("Dropping chat: {}", e);
                return Ok(());
            }
        };

        let relayed = ChatMessage {
            author_id: Some(membership.participant_id.as_str().to_string()),
            text: delivery.text.as_str().to_string(),
        };
        if let Some(frame) = encode(&[Message::ChatMessage(relayed)]) {
            if let Err(e) = self
                .state
                .send_chat_usecase
                .broadcast(delivery.targets, &frame)
                .await
            {
                tracing::warn!("Failed to broadcast chatMessage: {}", e);
            }
        }
        Ok(())
    }

    /// Tear down the session after the transport closed.
    ///
    /// Unregisters the connection, removes its participant and tells the
    /// remaining members. Consumes the session so it runs at most once.
    pub async fn close(self) {
        let usecase = &self.state.disconnect_participant_usecase;
        let removal = usecase
            .execute(self.phase.identity().map(|i| &i.id), self.phase.membership())
            .await;

        if let Some(removal) = removal {
            if let Some(frame) = encode(&departure_messages(&removal)) {
                if let Err(e) = usecase.broadcast_left(&removal, &frame).await {
                    tracing::warn!("Failed to broadcast presenceLeft: {}", e);
                }
            }
        }
    }

    fn reply(&self, message: Message) {
        send(&self.outbound, message);
    }
}

/// Queue one message on this connection's own channel.
fn send(outbound: &PusherChannel, message: Message) {
    match encode_message(&message) {
        Ok(frame) => {
            if outbound.send(frame).is_err() {
                tracing::debug!("Outbound channel closed, reply dropped");
            }
        }
        Err(e) => tracing::error!("Failed to encode frame: {}", e),
    }
}

/// Queue the joiner's `roomState`. Runs inside the registry's critical section.
fn send_snapshot(outbound: &PusherChannel, room: &Room, me: &Participant) {
    send(outbound, Message::RoomState(room_state(room, Some(&me.id))));
}

/// `presenceLeft`, followed by a fresh `roomState` when the crown moved.
fn departure_messages(removal: &Removal) -> Vec<Message> {
    let mut messages = vec![Message::PresenceLeft(PresenceLeft {
        participant_id: removal.departure.participant.id.as_str().to_string(),
    })];
    if let (Some(_), Some(room)) = (&removal.departure.new_owner, &removal.room) {
        messages.push(Message::RoomState(room_state(room, None)));
    }
    messages
}

fn encode(messages: &[Message]) -> Option<String> {
    match encode_frame(messages) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!("Failed to encode frame: {}", e);
            None
        }
    }
}
