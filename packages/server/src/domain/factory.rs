//! ID と Identity の生成

use uuid::Uuid;

use super::{Color, DisplayName, Identity, ParticipantId, UserId};

/// 生成する ID の長さ（16 進数 20 桁 = 80 bit）
const GENERATED_ID_LENGTH: usize = 20;

fn random_hex_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(GENERATED_ID_LENGTH);
    id
}

/// ランダムな ParticipantId を生成する
pub struct ParticipantIdFactory;

impl ParticipantIdFactory {
    pub fn generate() -> ParticipantId {
        ParticipantId::from(&UserIdFactory::generate())
    }
}

/// ランダムな UserId を生成する
pub struct UserIdFactory;

impl UserIdFactory {
    pub fn generate() -> UserId {
        UserId::from_generated(random_hex_id())
    }
}

/// ハンドシェイク時に Identity を発行する
pub struct IdentityFactory;

impl IdentityFactory {
    /// 新しい Identity を発行する
    ///
    /// 表示名は要求された名前が有効ならそれを、無効なら "Anonymous" を使う。
    /// 色は UserId のバイト列から決まる。
    pub fn issue(requested_name: Option<String>) -> Identity {
        let id = UserIdFactory::generate();
        let name = requested_name
            .and_then(|name| DisplayName::new(name).ok())
            .unwrap_or_else(DisplayName::anonymous);
        let color = color_for(&id);
        Identity { id, name, color }
    }
}

/// UserId から決定的に色を導出する
pub fn color_for(user_id: &UserId) -> Color {
    let bytes = user_id.as_str().as_bytes();
    let channel = |offset: usize| -> u8 {
        bytes
            .iter()
            .skip(offset)
            .step_by(3)
            .fold(offset as u8, |acc, b| acc.wrapping_mul(31).wrapping_add(*b))
    };
    Color::from_rgb(channel(0), channel(1), channel(2))
}
