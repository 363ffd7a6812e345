//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 実装は同じ Room に対する `admit` / `remove` / `update` を直列化しなければなりません。
//! 2 つの入室が同じ ParticipantId を割り当てることがあってはなりません。
//!
//! [`SnapshotHook`] は変更と同じ排他区間の中で呼ばれます。入室者宛ての
//! スナップショットをここで送信キューに積むと、その後に行われる他の参加者の
//! 変更の通知は必ずスナップショットより後に届きます。

use async_trait::async_trait;

use super::{
    ChatEntry, Departure, Identity, Participant, ParticipantId, ParticipantPatch, RepositoryError,
    Room, RoomId, RoomSettings, Timestamp, UserId,
};

/// 排他区間の中で、Room とその参加者を受け取るコールバック
pub type SnapshotHook<'a> = Box<dyn FnOnce(&Room, &Participant) + Send + 'a>;

/// 入室結果
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub participant: Participant,
    /// 入室後の Room のスナップショット
    pub room: Room,
    /// この入室で Room が新規作成されたか
    pub created: bool,
}

/// 退出結果
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub departure: Departure,
    /// 退出後の Room のスナップショット（空になり回収された場合は `None`）
    pub room: Option<Room>,
}

/// パッチ適用結果
#[derive(Debug, Clone, PartialEq)]
pub struct Patched {
    pub participant: Participant,
    /// 適用時点の Room の全メンバー（送信者を含む）
    pub members: Vec<UserId>,
}

/// Room Repository trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 参加者を Room に入室させる（Room が無ければ `settings` で作成する）
    ///
    /// 入室に成功した場合、`on_admitted` は排他区間を抜ける前に呼ばれる。
    async fn admit_with_snapshot(
        &self,
        identity: &Identity,
        room_id: &RoomId,
        settings: Option<RoomSettings>,
        joined_at: Timestamp,
        on_admitted: SnapshotHook<'_>,
    ) -> Result<Admission, RepositoryError>;

    /// [`RoomRepository::admit_with_snapshot`] のコールバックなし版
    async fn admit(
        &self,
        identity: &Identity,
        room_id: &RoomId,
        settings: Option<RoomSettings>,
        joined_at: Timestamp,
    ) -> Result<Admission, RepositoryError> {
        self.admit_with_snapshot(identity, room_id, settings, joined_at, Box::new(|_, _| {}))
            .await
    }

    /// 参加者がまだ Room にいれば、排他区間の中で `visit` を呼ぶ。
    /// 呼ばれた場合は `true`。
    async fn visit_member(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        visit: SnapshotHook<'_>,
    ) -> bool;

    /// 参加者を退出させる。既にいない場合は `None`（no-op）。
    async fn remove(&self, room_id: &RoomId, participant_id: &ParticipantId) -> Option<Removal>;

    /// 疎なパッチを適用する。既にいない場合は `None`（no-op）。
    ///
    /// 通知先は適用と同じ排他区間で確定する。
    async fn update(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        patch: &ParticipantPatch,
    ) -> Option<Patched>;

    /// Room のスナップショットを取得
    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// 全 Room のスナップショットを取得（RoomId 順）
    async fn list_rooms(&self) -> Vec<Room>;

    /// チャット履歴に追加
    async fn add_chat(&self, room_id: &RoomId, entry: ChatEntry) -> Result<(), RepositoryError>;
}
