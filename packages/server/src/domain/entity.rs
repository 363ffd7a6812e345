//! ドメインエンティティ
//!
//! - `Identity`: ハンドシェイクで発行される接続単位の身元
//! - `Participant`: Room に所属する参加者（Room 内で一意な ID を持つ）
//! - `Room`: 設定・オーナー（crown）・参加者名簿・チャット履歴を持つ集約

use std::collections::VecDeque;

use super::{
    error::RoomError,
    value_object::{
        ChatText, Color, DisplayName, ParticipantId, Position, RoomId, Timestamp, UserId,
    },
};

/// Room の参加者数の既定上限
pub const DEFAULT_PARTICIPANT_CAPACITY: usize = 64;
/// Room ごとに保持するチャット履歴の既定件数
pub const DEFAULT_CHAT_CAPACITY: usize = 32;

/// ハンドシェイクで発行される身元。接続中は不変。
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: UserId,
    pub name: DisplayName,
    pub color: Color,
}

/// 参加者への疎なパッチ。`Some` のフィールドだけが適用される。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantPatch {
    pub name: Option<DisplayName>,
    pub color: Option<Color>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl ParticipantPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.x.is_none() && self.y.is_none()
    }
}

/// Room に所属する参加者
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    /// この参加者を所有する接続の UserId（送信先の解決に使う）
    pub user_id: UserId,
    pub name: DisplayName,
    pub color: Color,
    pub position: Position,
    pub joined_at: Timestamp,
}

impl Participant {
    pub fn new(id: ParticipantId, identity: &Identity, joined_at: Timestamp) -> Self {
        Self {
            id,
            user_id: identity.id.clone(),
            name: identity.name.clone(),
            color: identity.color.clone(),
            position: Position::default(),
            joined_at,
        }
    }

    /// 疎なパッチを適用する。パッチに無いフィールドは変更しない。
    pub fn apply(&mut self, patch: &ParticipantPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(x) = patch.x {
            self.position.x = x;
        }
        if let Some(y) = patch.y {
            self.position.y = y;
        }
    }
}

/// Room の設定。作成者が指定し、Room の存続中は変わらない。
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSettings {
    pub visible: bool,
    pub chat_enabled: bool,
    pub crown_solo_enabled: bool,
    pub accent_color: Color,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            visible: true,
            chat_enabled: true,
            crown_solo_enabled: false,
            accent_color: Color::from_rgb(0x3b, 0x50, 0x54),
        }
    }
}

/// Room への所属（どの Room に、どの ParticipantId で）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
}

/// チャット履歴の 1 件
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub author: ParticipantId,
    pub text: ChatText,
    pub sent_at: Timestamp,
}

/// 参加者の退出結果
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub participant: Participant,
    /// 退出によって新たにオーナーになった参加者
    pub new_owner: Option<ParticipantId>,
}

/// Room 集約
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub settings: RoomSettings,
    /// オーナー（crown）。参加者がいる限り常に誰か 1 人を指す。
    pub owner: Option<ParticipantId>,
    /// 参加順に並んだ参加者
    pub participants: Vec<Participant>,
    pub chat_history: VecDeque<ChatEntry>,
    pub created_at: Timestamp,
    participant_capacity: usize,
    chat_capacity: usize,
}

impl Room {
    pub fn new(id: RoomId, settings: RoomSettings, created_at: Timestamp) -> Self {
        Self::with_capacity(
            id,
            settings,
            created_at,
            DEFAULT_PARTICIPANT_CAPACITY,
            DEFAULT_CHAT_CAPACITY,
        )
    }

    pub fn with_capacity(
        id: RoomId,
        settings: RoomSettings,
        created_at: Timestamp,
        participant_capacity: usize,
        chat_capacity: usize,
    ) -> Self {
        Self {
            id,
            settings,
            owner: None,
            participants: Vec::new(),
            chat_history: VecDeque::new(),
            created_at,
            participant_capacity,
            chat_capacity,
        }
    }

    /// 参加者が 1 人以上いる（Active 状態）
    pub fn is_active(&self) -> bool {
        !self.participants.is_empty()
    }

    pub fn participant_capacity(&self) -> usize {
        self.participant_capacity
    }

    pub fn contains(&self, participant_id: &ParticipantId) -> bool {
        self.participants.iter().any(|p| &p.id == participant_id)
    }

    pub fn find_participant(&self, participant_id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == participant_id)
    }

    pub fn find_by_user(&self, user_id: &UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.user_id == user_id)
    }

    pub fn is_owner(&self, participant_id: &ParticipantId) -> bool {
        self.owner.as_ref() == Some(participant_id)
    }

    /// crownsolo 設定下で、この参加者が入力を送ってよいか
    pub fn may_play(&self, participant_id: &ParticipantId) -> bool {
        !self.settings.crown_solo_enabled || self.is_owner(participant_id)
    }

    /// 参加者の送信先（UserId）一覧。`exclude` の参加者は除く。
    pub fn member_user_ids(&self, exclude: Option<&ParticipantId>) -> Vec<UserId> {
        self.participants
            .iter()
            .filter(|p| Some(&p.id) != exclude)
            .map(|p| p.user_id.clone())
            .collect()
    }

    /// 参加者を入室させる
    ///
    /// ParticipantId は UserId と同じ値が空いていればそれを使い、
    /// 使われていれば `generate_id` で空いている ID が出るまで生成する。
    /// オーナー不在の Room では入室者がオーナーになる。
    pub fn admit(
        &mut self,
        identity: &Identity,
        joined_at: Timestamp,
        mut generate_id: impl FnMut() -> ParticipantId,
    ) -> Result<Participant, RoomError> {
        if self.find_by_user(&identity.id).is_some() {
            return Err(RoomError::AlreadyJoined(identity.id.as_str().to_string()));
        }
        if self.participants.len() >= self.participant_capacity {
            return Err(RoomError::RoomFull {
                capacity: self.participant_capacity,
            });
        }

        let mut id = ParticipantId::from(&identity.id);
        while self.contains(&id) {
            id = generate_id();
        }

        let participant = Participant::new(id, identity, joined_at);
        if self.owner.is_none() {
            self.owner = Some(participant.id.clone());
        }
        self.participants.push(participant.clone());

        Ok(participant)
    }

    /// 参加者を退出させる
    ///
    /// オーナーが退出した場合は、残りの参加者のうち最も早く入室した参加者を
    /// 新しいオーナーにする。存在しない参加者の場合は `None`。
    pub fn remove(&mut self, participant_id: &ParticipantId) -> Option<Departure> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.id == participant_id)?;
        let participant = self.participants.remove(index);

        let mut new_owner = None;
        if self.is_owner(participant_id) {
            self.owner = self.participants.first().map(|p| p.id.clone());
            new_owner = self.owner.clone();
        }

        Some(Departure {
            participant,
            new_owner,
        })
    }

    /// 疎なパッチを参加者に適用する。存在しない参加者の場合は `None`。
    pub fn apply_patch(
        &mut self,
        participant_id: &ParticipantId,
        patch: &ParticipantPatch,
    ) -> Option<Participant> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| &p.id == participant_id)?;
        participant.apply(patch);
        Some(participant.clone())
    }

    /// チャット履歴に追加する。上限を超えた分は古いものから捨てる。
    pub fn add_chat(&mut self, entry: ChatEntry) {
        if self.chat_capacity == 0 {
            return;
        }
        while self.chat_history.len() >= self.chat_capacity {
            self.chat_history.pop_front();
        }
        self.chat_history.push_back(entry);
    }
}
