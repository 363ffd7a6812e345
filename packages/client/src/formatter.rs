//! Message formatting utilities for client display.

use keyroom_shared::{
    protocol::{Identity, InputAction, InputBatch, ParticipantInfo},
    time::timestamp_to_rfc3339,
};

use crate::{
    mirror::MirrorEvent,
    session::{ConnectionStatus, RoomView, SessionEvent},
};

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Render a session event, or `None` for events that are not displayed.
    pub fn format_event(event: &SessionEvent, me: Option<&str>) -> Option<String> {
        let text = match event {
            SessionEvent::Status(status) => Self::format_status(*status),
            SessionEvent::Identified(identity) => Self::format_identified(identity),
            SessionEvent::Joined { room, roster } => Self::format_joined(room, roster),
            SessionEvent::RoomUpdated(room) => Self::format_room_updated(room),
            SessionEvent::Participant(MirrorEvent::Added(participant)) => {
                format!("\n+ {} entered\n", display_name(participant))
            }
            SessionEvent::Participant(MirrorEvent::Removed(participant)) => {
                format!("\n- {} left\n", display_name(participant))
            }
            SessionEvent::Participant(MirrorEvent::Count(_)) => return None,
            SessionEvent::PresenceUpdated(participant) => {
                Self::format_presence(participant, me == Some(participant.id.as_str()))
            }
            SessionEvent::RemoteInput { author, batch } => {
                Self::format_remote_input(author, batch)
            }
            SessionEvent::Chat { author, text } => Self::format_chat(author, text),
            SessionEvent::Roster(roster) => Self::format_roster(roster, me),
            SessionEvent::Rejected(violation) => format!("\n! {}\n", violation),
            SessionEvent::Disconnected => "\nDisconnected from server\n".to_string(),
        };
        Some(text)
    }

    pub fn format_status(status: ConnectionStatus) -> String {
        let label = match status {
            ConnectionStatus::Offline => "Offline mode",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Online => "Online",
        };
        format!("\n[{}]\n", label)
    }

    pub fn format_identified(identity: &Identity) -> String {
        format!(
            "\nYou are '{}' ({}, {})\n",
            identity.display_name, identity.id, identity.color
        )
    }

    /// Format the room snapshot received on join
    pub fn format_joined(room: &RoomView, roster: &[ParticipantInfo]) -> String {
        let mut output = format!("\n\n{}\nRoom '{}'", RULE, room.room_id);
        if room.settings.crown_solo_enabled {
            output.push_str(" (crown solo)");
        }
        if !room.settings.chat_enabled {
            output.push_str(" (chat disabled)");
        }
        output.push('\n');
        output.push_str(&Self::roster_lines(
            roster,
            Some(&room.participant_id),
            room.owner_id.as_deref(),
        ));
        output.push_str(RULE);
        output.push('\n');
        output
    }

    pub fn format_room_updated(room: &RoomView) -> String {
        match &room.owner_id {
            Some(owner) if *owner == room.participant_id => {
                "\n* You now hold the crown\n".to_string()
            }
            Some(owner) => format!("\n* Crown passed to {}\n", owner),
            None => "\n* The room has no owner\n".to_string(),
        }
    }

    pub fn format_presence(participant: &ParticipantInfo, is_me: bool) -> String {
        let me_suffix = if is_me { " (me)" } else { "" };
        format!(
            "\n~ {}{} {} at ({:.1}, {:.1})\n",
            display_name(participant),
            me_suffix,
            participant.color,
            participant.x,
            participant.y
        )
    }

    /// Format a chat message
    pub fn format_chat(author: &ParticipantInfo, text: &str) -> String {
        format!(
            "\n\n------------------------------------------------------------\n\
             @{}: {}\n\
             ------------------------------------------------------------\n",
            display_name(author),
            text
        )
    }

    /// Format a remote input batch with shared-timeline times
    pub fn format_remote_input(author: &ParticipantInfo, batch: &InputBatch) -> String {
        let mut output = format!(
            "\n♪ {} at {}\n",
            display_name(author),
            timestamp_to_rfc3339(batch.anchor_time as i64)
        );
        for event in &batch.events {
            let action = match &event.action {
                InputAction::NoteOn {
                    note,
                    velocity: Some(velocity),
                } => format!("on  {:>3} vel {:.3}", note, velocity),
                InputAction::NoteOn {
                    note,
                    velocity: None,
                } => format!("on  {:>3}", note),
                InputAction::NoteOff { note } => format!("off {:>3}", note),
                InputAction::Control { controller, value } => {
                    format!("cc  {:>3} = {:.3}", controller, value)
                }
            };
            output.push_str(&format!(
                "  +{:>7.1}ms {}\n",
                event.delta_ms, action
            ));
        }
        output
    }

    /// Format the current roster (`/who`)
    pub fn format_roster(roster: &[ParticipantInfo], me: Option<&str>) -> String {
        format!(
            "\n{}\n{}{}\n",
            RULE,
            Self::roster_lines(roster, me, None),
            RULE
        )
    }

    fn roster_lines(roster: &[ParticipantInfo], me: Option<&str>, owner: Option<&str>) -> String {
        let mut output = String::from("Participants:\n");
        if roster.is_empty() {
            output.push_str("(No participants)\n");
        }
        for participant in roster {
            let me_suffix = if me == Some(participant.id.as_str()) {
                " (me)"
            } else {
                ""
            };
            let crown = if owner == Some(participant.id.as_str()) {
                " [crown]"
            } else {
                ""
            };
            output.push_str(&format!(
                "{}{}{} {}\n",
                display_name(participant),
                me_suffix,
                crown,
                participant.color
            ));
        }
        output
    }
}

fn display_name(participant: &ParticipantInfo) -> &str {
    if participant.display_name.is_empty() {
        "(unknown)"
    } else {
        participant.display_name.as_str()
    }
}
