//! Append-only transcript with in-place replacement of pending entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

const PENDING_PREFIX: &str = "pending-";
const SETTLED_PREFIX: &str = "entry-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    fn pending(seq: u64) -> Self {
        Self(format!("{PENDING_PREFIX}{seq}"))
    }

    fn settled(seq: u64) -> Self {
        Self(format!("{SETTLED_PREFIX}{seq}"))
    }

    pub fn is_pending(&self) -> bool {
        self.0.starts_with(PENDING_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Message,
    Error,
    Thinking,
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub origin: Origin,
    pub kind: EntryKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn is_pending(&self) -> bool {
        self.id.is_pending()
    }
}

/// Ordered session history. Ids are minted here from a counter that survives
/// `clear`, so an id is never handed out twice within one log.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
    next_seq: u64,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        origin: Origin,
        kind: EntryKind,
        text: impl Into<String>,
    ) -> EntryId {
        let id = self.mint(false);
        self.entries.push(TranscriptEntry {
            id: id.clone(),
            origin,
            kind,
            text: text.into(),
            created_at: Utc::now(),
        });
        id
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> EntryId {
        self.append(Origin::User, EntryKind::Message, text)
    }

    pub fn push_system(&mut self, kind: EntryKind, text: impl Into<String>) -> EntryId {
        self.append(Origin::System, kind, text)
    }

    /// Appends a mutable System placeholder.
    pub fn push_pending(&mut self, kind: EntryKind, text: impl Into<String>) -> EntryId {
        let id = self.mint(true);
        self.entries.push(TranscriptEntry {
            id: id.clone(),
            origin: Origin::System,
            kind,
            text: text.into(),
            created_at: Utc::now(),
        });
        id
    }

    /// Swaps a pending entry for a settled one at the same position, keeping its origin.
    /// Returns the new id, or `None` when `id` is no longer present.
    pub fn replace(
        &mut self,
        id: &EntryId,
        kind: EntryKind,
        text: impl Into<String>,
    ) -> Option<EntryId> {
        let Some(idx) = self.position_of_pending(id) else {
            debug!(entry_id = %id, "replace skipped; entry no longer present");
            return None;
        };
        let new_id = self.mint(false);
        let entry = &mut self.entries[idx];
        entry.id = new_id.clone();
        entry.kind = kind;
        entry.text = text.into();
        entry.created_at = Utc::now();
        Some(new_id)
    }

    /// Rewrites the text of a pending entry in place. Returns `false` once the entry is gone.
    pub fn set_text(&mut self, id: &EntryId, text: impl Into<String>) -> bool {
        match self.position_of_pending(id) {
            Some(idx) => {
                self.entries[idx].text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &EntryId) -> bool {
        match self.position_of_pending(id) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, id: &EntryId) -> Option<&TranscriptEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Settled entries are immutable, so lookups for mutation only match pending ids.
    fn position_of_pending(&self, id: &EntryId) -> Option<usize> {
        if !id.is_pending() {
            return None;
        }
        self.entries.iter().position(|entry| &entry.id == id)
    }

    fn mint(&mut self, pending: bool) -> EntryId {
        self.next_seq += 1;
        if pending {
            EntryId::pending(self.next_seq)
        } else {
            EntryId::settled(self.next_seq)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(log: &TranscriptLog) -> Vec<&str> {
        log.entries().iter().map(|entry| entry.text.as_str()).collect()
    }

    #[test]
    fn replace_keeps_position_and_origin() {
        let mut log = TranscriptLog::new();
        log.push_user("parent(tom, bob).");
        let pending = log.push_pending(EntryKind::Loading, "Loading domain animals...");
        log.push_user("later");

        let new_id = log
            .replace(&pending, EntryKind::Message, "ready")
            .expect("replaced");

        assert_eq!(texts(&log), vec!["parent(tom, bob).", "ready", "later"]);
        let entry = log.get(&new_id).expect("entry");
        assert_eq!(entry.origin, Origin::System);
        assert_eq!(entry.kind, EntryKind::Message);
        assert!(!entry.is_pending());
        assert!(log.get(&pending).is_none());
    }

    #[test]
    fn mutations_on_missing_or_settled_ids_are_silent_noops() {
        let mut log = TranscriptLog::new();
        let settled = log.push_system(EntryKind::Message, "hello");
        let pending = log.push_pending(EntryKind::Thinking, "Thinking");
        log.clear();

        assert!(log.replace(&pending, EntryKind::Message, "late").is_none());
        assert!(!log.set_text(&pending, "Thinking.."));
        assert!(!log.remove(&pending));
        assert!(log.is_empty());

        let settled_again = log.push_system(EntryKind::Message, "fixed");
        assert!(!log.set_text(&settled_again, "mutated"));
        assert!(!log.remove(&settled_again));
        assert_eq!(texts(&log), vec!["fixed"]);
        assert_ne!(settled, settled_again);
    }

    #[test]
    fn ids_are_never_reused_across_clear() {
        let mut log = TranscriptLog::new();
        let first = log.push_pending(EntryKind::Thinking, "Thinking");
        log.clear();
        let second = log.push_pending(EntryKind::Thinking, "Thinking");
        assert_ne!(first, second);
        assert!(first.is_pending() && second.is_pending());
    }

    #[test]
    fn set_text_and_remove_target_pending_entry_only() {
        let mut log = TranscriptLog::new();
        log.push_user("q");
        let pending = log.push_pending(EntryKind::Thinking, "Thinking");
        assert!(log.set_text(&pending, "Thinking..."));
        assert_eq!(log.last().map(|entry| entry.text.as_str()), Some("Thinking..."));
        assert!(log.remove(&pending));
        assert_eq!(texts(&log), vec!["q"]);
    }
}
