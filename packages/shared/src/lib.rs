//! Shared building blocks for the Keyroom server and client.
//!
//! - `protocol`: message envelope types and the frame codec
//! - `time`: clock abstraction used for every timestamp on the wire
//! - `logger`: tracing subscriber bootstrap for the binaries

pub mod logger;
pub mod protocol;
pub mod time;
