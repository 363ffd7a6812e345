//! Server configuration.

use crate::domain::{DEFAULT_CHAT_CAPACITY, DEFAULT_PARTICIPANT_CAPACITY};

/// Runtime configuration of the room server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Maximum number of participants admitted into one room
    pub room_capacity: usize,
    /// Number of chat messages retained per room
    pub chat_history: usize,
    /// Drop a room as soon as its last participant leaves
    pub reap_empty_rooms: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            room_capacity: DEFAULT_PARTICIPANT_CAPACITY,
            chat_history: DEFAULT_CHAT_CAPACITY,
            reap_empty_rooms: true,
        }
    }
}
