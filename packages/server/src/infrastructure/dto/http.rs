//! HTTP API response DTOs.

use keyroom_shared::{protocol::RoomSettings as SettingsDto, time::timestamp_to_rfc3339};
use serde::{Deserialize, Serialize};

use crate::domain::{Participant, Room};

/// `GET /api/rooms` の 1 件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub participant_count: usize,
    pub owner_id: Option<String>,
    pub created_at: String,
}

/// `GET /api/rooms/{room_id}` のレスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub settings: SettingsDto,
    pub owner_id: Option<String>,
    pub participants: Vec<ParticipantDetailDto>,
    pub capacity: usize,
    pub chat_history_len: usize,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetailDto {
    pub id: String,
    pub display_name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub joined_at: String,
}

impl From<&Room> for RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            participant_count: room.participants.len(),
            owner_id: room.owner.as_ref().map(|id| id.as_str().to_string()),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&Participant> for ParticipantDetailDto {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id.as_str().to_string(),
            display_name: participant.name.as_str().to_string(),
            color: participant.color.as_str().to_string(),
            x: participant.position.x,
            y: participant.position.y,
            joined_at: timestamp_to_rfc3339(participant.joined_at.value()),
        }
    }
}

impl From<&Room> for RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            settings: (&room.settings).into(),
            owner_id: room.owner.as_ref().map(|id| id.as_str().to_string()),
            participants: room.participants.iter().map(Into::into).collect(),
            capacity: room.participant_capacity(),
            chat_history_len: room.chat_history.len(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}
