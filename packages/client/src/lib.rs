//! Keyroom terminal client.
//!
//! - `clock`: server clock offset estimation and smoothing
//! - `batcher`: delta-encoded input event batches
//! - `mirror`: local copy of the room roster
//! - `session`: protocol state machine (pure, no I/O)
//! - `connection`: WebSocket driver and per-connection timers
//! - `runner`: reconnect loop and interactive prompt

pub mod batcher;
pub mod clock;
pub mod command;
pub mod connection;
pub mod error;
pub mod formatter;
pub mod mirror;
pub mod runner;
pub mod session;
pub mod ui;

pub use runner::{ClientOptions, ReconnectPolicy, run_client};
