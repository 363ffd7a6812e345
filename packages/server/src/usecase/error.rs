//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{RepositoryError, RoomError, ValueObjectError};

/// 現在のセッション状態では受け付けられないメッセージ
///
/// 接続単位のエラーであり、該当メッセージを捨てるだけで接続は維持する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("'{0}' received before handshake")]
    NotIdentified(&'static str),

    #[error("'{0}' received while not in a room")]
    NotInRoom(&'static str),

    #[error("'{0}' is not accepted from clients")]
    UnexpectedKind(&'static str),

    #[error("only the room owner may send input in this room")]
    InputNotPermitted,

    #[error("chat is disabled in this room")]
    ChatDisabled,
}

/// 入室の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("invalid room id: {0}")]
    InvalidRoomId(#[source] ValueObjectError),

    #[error("room is full (capacity: {capacity})")]
    RoomFull { capacity: usize },

    #[error("already joined as '{0}'")]
    AlreadyJoined(String),

    #[error("room '{0}' not found")]
    RoomNotFound(String),
}

impl From<RepositoryError> for JoinError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Room(RoomError::RoomFull { capacity }) => {
                JoinError::RoomFull { capacity }
            }
            RepositoryError::Room(RoomError::AlreadyJoined(id)) => JoinError::AlreadyJoined(id),
            RepositoryError::RoomNotFound(id) => JoinError::RoomNotFound(id),
        }
    }
}

/// チャット送信の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendChatError {
    #[error(transparent)]
    Violation(#[from] ProtocolViolation),

    #[error("invalid chat text: {0}")]
    InvalidText(#[from] ValueObjectError),
}
