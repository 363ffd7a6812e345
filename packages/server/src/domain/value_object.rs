//! 値オブジェクト
//!
//! 生成時にバリデーションを行い、不正な値を持つインスタンスが存在しないことを保証します。

use super::error::ValueObjectError;

/// ParticipantId / UserId の最大長
pub const MAX_ID_LENGTH: usize = 64;
/// RoomId の最大長
pub const MAX_ROOM_ID_LENGTH: usize = 512;
/// 表示名の最大長（文字数）
pub const MAX_DISPLAY_NAME_LENGTH: usize = 40;
/// チャット本文の最大長（文字数）
pub const MAX_CHAT_TEXT_LENGTH: usize = 512;
/// 表示名が指定されなかった場合の既定値
pub const ANONYMOUS_NAME: &str = "Anonymous";

fn validate_id(field: &'static str, value: &str, max: usize) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    if value.chars().count() > max {
        return Err(ValueObjectError::TooLong { field, max });
    }
    Ok(())
}

/// 接続（ハンドシェイク）ごとに発行されるユーザー ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id("user id", &value, MAX_ID_LENGTH)?;
        Ok(Self(value))
    }

    /// ファクトリが生成した（常に有効な）値から作る
    pub(super) fn from_generated(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Room 内で一意な参加者 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id("participant id", &value, MAX_ID_LENGTH)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&UserId> for ParticipantId {
    /// UserId と ParticipantId は同じ制約を持つため、そのまま変換できる
    fn from(user_id: &UserId) -> Self {
        Self(user_id.as_str().to_string())
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Room ID（例: "lobby"）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id("room id", &value, MAX_ROOM_ID_LENGTH)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// 表示名（前後の空白は除去される）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::Empty("display name"));
        }
        if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
            return Err(ValueObjectError::TooLong {
                field: "display name",
                max: MAX_DISPLAY_NAME_LENGTH,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_NAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `#rgb` または `#rrggbb` 形式の色（小文字に正規化される）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color(String);

impl Color {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let hex = value
            .strip_prefix('#')
            .ok_or_else(|| ValueObjectError::InvalidColor(value.clone()))?;
        let valid_length = hex.len() == 3 || hex.len() == 6;
        if !valid_length || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValueObjectError::InvalidColor(value));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// RGB 値から色を作る
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{:02x}{:02x}{:02x}", r, g, b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// カーソル位置
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// チャット本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatText(String);

impl ChatText {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::Empty("chat text"));
        }
        if value.chars().count() > MAX_CHAT_TEXT_LENGTH {
            return Err(ValueObjectError::TooLong {
                field: "chat text",
                max: MAX_CHAT_TEXT_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
