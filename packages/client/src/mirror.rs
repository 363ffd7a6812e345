//! Client-side mirror of a room's participant registry.

use std::collections::BTreeMap;

use keyroom_shared::protocol::{ParticipantInfo, PresencePatch};

/// Change notification raised by the mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorEvent {
    Added(ParticipantInfo),
    Removed(ParticipantInfo),
    /// Participant count after an add or remove.
    Count(usize),
}

/// Read-mostly copy of the roster, keyed by participant id.
#[derive(Debug, Clone, Default)]
pub struct ParticipantMirror {
    participants: BTreeMap<String, ParticipantInfo>,
}

impl ParticipantMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, participant_id: &str) -> Option<&ParticipantInfo> {
        self.participants.get(participant_id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantInfo> {
        self.participants.values()
    }

    /// Reconcile with a full roster snapshot.
    ///
    /// Entries missing from the snapshot are removed, new ones are added and
    /// known ones take the snapshot's fields. Applying the same snapshot again
    /// changes nothing and raises no events.
    pub fn apply_snapshot(&mut self, roster: &[ParticipantInfo]) -> Vec<MirrorEvent> {
        let mut events = Vec::new();

        let stale: Vec<String> = self
            .participants
            .keys()
            .filter(|id| !roster.iter().any(|p| &p.id == *id))
            .cloned()
            .collect();
        for id in stale {
            events.extend(self.remove(&id));
        }

        for participant in roster {
            match self.participants.get_mut(&participant.id) {
                Some(existing) => *existing = participant.clone(),
                None => events.extend(self.insert(participant.clone())),
            }
        }

        events
    }

    /// Apply a sparse patch; only fields present in the patch change.
    ///
    /// An unknown participant is added only by a full patch (a join). A sparse
    /// patch for an unknown id is a stale reference and changes nothing.
    pub fn apply_patch(&mut self, participant_id: &str, patch: &PresencePatch) -> Vec<MirrorEvent> {
        if let Some(participant) = self.participants.get_mut(participant_id) {
            apply_patch(participant, patch);
            return Vec::new();
        }
        match patch.to_participant(participant_id) {
            Some(participant) => self.insert(participant),
            None => {
                tracing::debug!("Ignoring sparse patch for unknown participant {}", participant_id);
                Vec::new()
            }
        }
    }

    /// Remove a participant; unknown ids are a no-op.
    pub fn remove(&mut self, participant_id: &str) -> Vec<MirrorEvent> {
        match self.participants.remove(participant_id) {
            Some(participant) => vec![
                MirrorEvent::Removed(participant),
                MirrorEvent::Count(self.participants.len()),
            ],
            None => {
                tracing::debug!("Ignoring removal of unknown participant {}", participant_id);
                Vec::new()
            }
        }
    }

    /// Remove every participant, raising one removal per entry.
    pub fn clear(&mut self) -> Vec<MirrorEvent> {
        self.apply_snapshot(&[])
    }

    fn insert(&mut self, participant: ParticipantInfo) -> Vec<MirrorEvent> {
        self.participants
            .insert(participant.id.clone(), participant.clone());
        vec![
            MirrorEvent::Added(participant),
            MirrorEvent::Count(self.participants.len()),
        ]
    }
}

fn apply_patch(participant: &mut ParticipantInfo, patch: &PresencePatch) {
    if let Some(display_name) = &patch.display_name {
        participant.display_name = display_name.clone();
    }
    if let Some(color) = &patch.color {
        participant.color = color.clone();
    }
    if let Some(x) = patch.x {
        participant.x = x;
    }
    if let Some(y) = patch.y {
        participant.y = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: &str, name: &str) -> ParticipantInfo {
        ParticipantInfo {
            id: id.to_string(),
            display_name: name.to_string(),
            color: "#123456".to_string(),
            x: 0.0,
            y: 0.0,
        }
    }

    #[test]
    fn test_snapshot_adds_and_removes_entries() {
        // テスト項目: スナップショットにない参加者は削除され、新しい参加者は追加される
        // given (前提条件):
        let mut mirror = ParticipantMirror::new();
        mirror.apply_snapshot(&[participant("a", "Alice"), participant("b", "Bob")]);

        // when (操作):
        let events =
            mirror.apply_snapshot(&[participant("b", "Bob"), participant("c", "Carol")]);

        // then (期待する結果):
        assert_eq!(
            events,
            vec![
                MirrorEvent::Removed(participant("a", "Alice")),
                MirrorEvent::Count(1),
                MirrorEvent::Added(participant("c", "Carol")),
                MirrorEvent::Count(2),
            ]
        );
        let ids: Vec<&str> = mirror.participants().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        // テスト項目: 同じスナップショットを 2 回適用しても 1 回と同じ状態になる
        // given (前提条件):
        let roster = vec![participant("a", "Alice"), participant("b", "Bob")];
        let mut mirror = ParticipantMirror::new();
        mirror.apply_snapshot(&roster);
        let once: Vec<ParticipantInfo> = mirror.participants().cloned().collect();

        // when (操作):
        let events = mirror.apply_snapshot(&roster);

        // then (期待する結果):
        assert!(events.is_empty());
        let twice: Vec<ParticipantInfo> = mirror.participants().cloned().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sparse_patches_leave_other_fields_untouched() {
        // テスト項目: x だけ、color だけのパッチを順に適用しても名前は変わらない
        // given (前提条件):
        let mut mirror = ParticipantMirror::new();
        mirror.apply_snapshot(&[participant("A", "Alice")]);

        // when (操作):
        mirror.apply_patch(
            "A",
            &PresencePatch {
                x: Some(5.0),
                ..PresencePatch::default()
            },
        );
        mirror.apply_patch(
            "A",
            &PresencePatch {
                color: Some("#fff".to_string()),
                ..PresencePatch::default()
            },
        );

        // then (期待する結果):
        let alice = mirror.get("A").unwrap();
        assert_eq!(alice.x, 5.0);
        assert_eq!(alice.color, "#fff");
        assert_eq!(alice.display_name, "Alice");
    }

    #[test]
    fn test_patch_for_unknown_participant_adds_it() {
        // テスト項目: 未知の参加者へのパッチは参加者の追加として扱われる
        // given (前提条件):
        let mut mirror = ParticipantMirror::new();
        let patch = PresencePatch::full(&participant("b", "Bob"));

        // when (操作):
        let events = mirror.apply_patch("b", &patch);

        // then (期待する結果):
        assert_eq!(
            events,
            vec![
                MirrorEvent::Added(participant("b", "Bob")),
                MirrorEvent::Count(1)
            ]
        );
    }

    #[test]
    fn test_sparse_patch_for_unknown_participant_is_ignored() {
        // テスト項目: 未知の参加者への疎なパッチは無視され、空の参加者は作られない
        // given (前提条件):
        let mut mirror = ParticipantMirror::new();
        mirror.apply_snapshot(&[participant("A", "Alice")]);

        // when (操作):
        let events = mirror.apply_patch(
            "ghost",
            &PresencePatch {
                x: Some(5.0),
                ..PresencePatch::default()
            },
        );

        // then (期待する結果):
        assert!(events.is_empty());
        assert!(mirror.get("ghost").is_none());
        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        // テスト項目: 存在しない参加者の削除は何もしない
        // given (前提条件):
        let mut mirror = ParticipantMirror::new();

        // when (操作):
        let events = mirror.remove("ghost");

        // then (期待する結果):
        assert!(events.is_empty());
    }

    #[test]
    fn test_clear_raises_removal_per_participant() {
        // テスト項目: clear で全参加者の削除通知と件数通知が出る
        // given (前提条件):
        let mut mirror = ParticipantMirror::new();
        mirror.apply_snapshot(&[participant("a", "Alice"), participant("b", "Bob")]);

        // when (操作):
        let events = mirror.clear();

        // then (期待する結果):
        assert!(mirror.is_empty());
        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&MirrorEvent::Count(0)));
    }
}
