//! Data Transfer Objects
//!
//! - `conversion`: ドメインモデルと WebSocket プロトコル型（`keyroom_shared::protocol`）の変換
//! - `http`: HTTP API のレスポンス DTO

pub mod conversion;
pub mod http;
