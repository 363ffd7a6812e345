//! Message envelope types exchanged between server and client.
//!
//! Every message is a JSON object discriminated by its `kind` field. Field names
//! are camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Default accent color of a newly created room.
pub const DEFAULT_ACCENT_COLOR: &str = "#3b5054";

/// Accent color reported while the client is offline.
pub const OFFLINE_ACCENT_COLOR: &str = "#ecfaed";

/// Identity issued by the server on handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub color: String,
}

/// Per-room configuration, supplied by the creator of the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSettings {
    pub visible: bool,
    pub chat_enabled: bool,
    pub crown_solo_enabled: bool,
    pub accent_color: String,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            visible: true,
            chat_enabled: true,
            crown_solo_enabled: false,
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

impl RoomSettings {
    /// Settings reported by a client that is not connected to any room.
    pub fn offline() -> Self {
        Self {
            visible: false,
            chat_enabled: false,
            crown_solo_enabled: false,
            accent_color: OFFLINE_ACCENT_COLOR.to_string(),
        }
    }
}

/// Full participant record as carried in a roster snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: String,
    pub display_name: String,
    pub color: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Sparse patch to a participant: only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl PresencePatch {
    /// Patch that carries every field of `participant`.
    pub fn full(participant: &ParticipantInfo) -> Self {
        Self {
            display_name: Some(participant.display_name.clone()),
            color: Some(participant.color.clone()),
            x: Some(participant.x),
            y: Some(participant.y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.color.is_none() && self.x.is_none() && self.y.is_none()
    }

    /// The participant described by a full patch, `None` when any field is missing.
    pub fn to_participant(&self, participant_id: &str) -> Option<ParticipantInfo> {
        Some(ParticipantInfo {
            id: participant_id.to_string(),
            display_name: self.display_name.clone()?,
            color: self.color.clone()?,
            x: self.x?,
            y: self.y?,
        })
    }
}

/// `handshake`: client hello (`name`) or server identity assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Preferred display name requested by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<f64>,
}

impl Handshake {
    pub fn request(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn reply(identity: Identity, server_time: f64) -> Self {
        Self {
            name: None,
            identity: Some(identity),
            server_time: Some(server_time),
        }
    }
}

/// `timeSync`: round trip used for clock offset estimation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSync {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<f64>,
}

/// `joinRoom`: request membership of a room, creating it when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RoomSettings>,
}

/// `roomState`: full snapshot of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub room_id: String,
    #[serde(default)]
    pub settings: RoomSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// The recipient's own participant id; only set on the joiner's snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub roster: Vec<ParticipantInfo>,
}

/// `presenceUpdate`: sparse patch addressed to one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub participant_id: String,
    #[serde(flatten)]
    pub patch: PresencePatch,
}

/// `presenceLeft`: participant removal notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceLeft {
    pub participant_id: String,
}

/// Payload of a single input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum InputAction {
    NoteOn {
        note: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        velocity: Option<f64>,
    },
    NoteOff {
        note: u8,
    },
    Control {
        controller: u8,
        value: f64,
    },
}

/// One entry of an input batch, offset from the batch anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    pub delta_ms: f64,
    #[serde(flatten)]
    pub action: InputAction,
}

/// `inputBatch`: note/control events delta-encoded against `anchor_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBatch {
    /// Sender, stamped by the server when relaying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    pub anchor_time: f64,
    pub events: Vec<InputEvent>,
}

/// `chatMessage`: free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Author, stamped by the server when relaying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub text: String,
}

/// A typed protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Message {
    Handshake(Handshake),
    TimeSync(TimeSync),
    JoinRoom(JoinRoom),
    RoomState(RoomState),
    PresenceUpdate(PresenceUpdate),
    PresenceLeft(PresenceLeft),
    InputBatch(InputBatch),
    ChatMessage(ChatMessage),
}

impl Message {
    /// Discriminators understood by this protocol version.
    pub const KNOWN_KINDS: [&'static str; 8] = [
        "handshake",
        "timeSync",
        "joinRoom",
        "roomState",
        "presenceUpdate",
        "presenceLeft",
        "inputBatch",
        "chatMessage",
    ];

    pub fn is_known_kind(kind: &str) -> bool {
        Self::KNOWN_KINDS.contains(&kind)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Handshake(_) => "handshake",
            Message::TimeSync(_) => "timeSync",
            Message::JoinRoom(_) => "joinRoom",
            Message::RoomState(_) => "roomState",
            Message::PresenceUpdate(_) => "presenceUpdate",
            Message::PresenceLeft(_) => "presenceLeft",
            Message::InputBatch(_) => "inputBatch",
            Message::ChatMessage(_) => "chatMessage",
        }
    }
}
