//! ドメインモデルとプロトコル型の変換
//!
//! クライアントから届いた値はここで検証済みのドメイン型に変換されます。
//! 不正なフィールドは黙って捨てられ、既存の値を消去することはありません。

use keyroom_shared::protocol as wire;

use crate::domain::{
    Color, DisplayName, Identity, Participant, ParticipantId, ParticipantPatch, Room, RoomSettings,
};

// ========================================
// Domain → Protocol
// ========================================

impl From<&Identity> for wire::Identity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.as_str().to_string(),
            display_name: identity.name.as_str().to_string(),
            color: identity.color.as_str().to_string(),
        }
    }
}

impl From<&Participant> for wire::ParticipantInfo {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id.as_str().to_string(),
            display_name: participant.name.as_str().to_string(),
            color: participant.color.as_str().to_string(),
            x: participant.position.x,
            y: participant.position.y,
        }
    }
}

impl From<&RoomSettings> for wire::RoomSettings {
    fn from(settings: &RoomSettings) -> Self {
        Self {
            visible: settings.visible,
            chat_enabled: settings.chat_enabled,
            crown_solo_enabled: settings.crown_solo_enabled,
            accent_color: settings.accent_color.as_str().to_string(),
        }
    }
}

impl From<&ParticipantPatch> for wire::PresencePatch {
    fn from(patch: &ParticipantPatch) -> Self {
        Self {
            display_name: patch.name.as_ref().map(|n| n.as_str().to_string()),
            color: patch.color.as_ref().map(|c| c.as_str().to_string()),
            x: patch.x,
            y: patch.y,
        }
    }
}

/// Room のスナップショットを `roomState` に変換する
///
/// `recipient` は受信者自身の ParticipantId（入室者への応答でのみ指定する）。
pub fn room_state(room: &Room, recipient: Option<&ParticipantId>) -> wire::RoomState {
    wire::RoomState {
        room_id: room.id.as_str().to_string(),
        settings: (&room.settings).into(),
        owner_id: room.owner.as_ref().map(|id| id.as_str().to_string()),
        participant_id: recipient.map(|id| id.as_str().to_string()),
        roster: room.participants.iter().map(Into::into).collect(),
    }
}

/// 入室者の全フィールドを持つ `presenceUpdate` を作る
pub fn presence_joined(participant: &Participant) -> wire::PresenceUpdate {
    let info = wire::ParticipantInfo::from(participant);
    wire::PresenceUpdate {
        participant_id: info.id.clone(),
        patch: wire::PresencePatch::full(&info),
    }
}

/// 参加者の変更を `presenceUpdate` に変換する
pub fn presence_update(
    participant_id: &ParticipantId,
    patch: &ParticipantPatch,
) -> wire::PresenceUpdate {
    wire::PresenceUpdate {
        participant_id: participant_id.as_str().to_string(),
        patch: patch.into(),
    }
}

// ========================================
// Protocol → Domain
// ========================================

impl From<wire::RoomSettings> for RoomSettings {
    fn from(settings: wire::RoomSettings) -> Self {
        let accent_color = match Color::new(settings.accent_color) {
            Ok(color) => color,
            Err(e) => {
                tracing::debug!("Ignoring room accent color: {}", e);
                RoomSettings::default().accent_color
            }
        };
        Self {
            visible: settings.visible,
            chat_enabled: settings.chat_enabled,
            crown_solo_enabled: settings.crown_solo_enabled,
            accent_color,
        }
    }
}

impl From<&wire::PresencePatch> for ParticipantPatch {
    fn from(patch: &wire::PresencePatch) -> Self {
        let name = patch
            .display_name
            .clone()
            .and_then(|name| match DisplayName::new(name) {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::debug!("Dropping displayName from presence patch: {}", e);
                    None
                }
            });
        let color = patch
            .color
            .clone()
            .and_then(|color| match Color::new(color) {
                Ok(color) => Some(color),
                Err(e) => {
                    tracing::debug!("Dropping color from presence patch: {}", e);
                    None
                }
            });
        Self {
            name,
            color,
            x: patch.x.filter(|x| x.is_finite()),
            y: patch.y.filter(|y| y.is_finite()),
        }
    }
}
