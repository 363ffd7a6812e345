//! Keyroom room server.
//!
//! Clients connect over WebSocket, receive an identity on handshake and join
//! named rooms. The server keeps every room's roster, settings and owner
//! ("crown"), and relays presence, input batches and chat between members.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
