use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use super::{SrsStore, StoreResult, Transition};
use crate::error::StoreError;
use crate::services::study_queue::DueCandidate;
use crate::types::{CardMemoryState, Entry, EntryId, NewEntry, ReviewEvent, UserId};

/// Process-local store. Every operation takes one lock, which gives
/// `commit_review` its read-modify-write atomicity.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_entry_id: EntryId,
    entries: BTreeMap<EntryId, Entry>,
    states: HashMap<(UserId, EntryId), CardMemoryState>,
    reviews: Vec<ReviewEvent>,
}

impl Inner {
    fn owned(&self, user_id: UserId, entry_id: EntryId) -> Option<&Entry> {
        self.entries
            .get(&entry_id)
            .filter(|entry| entry.user_id == user_id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a memory state directly. Intended for seeding and imports.
    pub fn put_memory_state(
        &self,
        user_id: UserId,
        entry_id: EntryId,
        state: CardMemoryState,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.owned(user_id, entry_id).is_none() {
            return Err(StoreError::NotFound(format!("entry {entry_id}")));
        }
        inner.states.insert((user_id, entry_id), state);
        Ok(())
    }

    pub fn review_count(&self) -> usize {
        self.inner.lock().reviews.len()
    }
}

impl SrsStore for MemoryStore {
    fn insert_entry(&self, entry: NewEntry) -> StoreResult<Entry> {
        let mut inner = self.inner.lock();
        let duplicate = inner
            .entries
            .values()
            .any(|e| e.user_id == entry.user_id && e.expression == entry.expression);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "expression `{}` already saved",
                entry.expression
            )));
        }

        inner.next_entry_id += 1;
        let saved = Entry {
            id: inner.next_entry_id,
            user_id: entry.user_id,
            expression: entry.expression,
            meaning: entry.content.meaning,
            examples: entry.content.examples,
            tone_tip: entry.content.tone_tip,
            etymology: entry.content.etymology,
            created_at: entry.created_at,
        };
        inner.entries.insert(saved.id, saved.clone());
        Ok(saved)
    }

    fn find_entry(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<Option<Entry>> {
        Ok(self.inner.lock().owned(user_id, entry_id).cloned())
    }

    fn find_entry_by_expression(
        &self,
        user_id: UserId,
        expression: &str,
    ) -> StoreResult<Option<Entry>> {
        let inner = self.inner.lock();
        Ok(inner
            .entries
            .values()
            .find(|e| e.user_id == user_id && e.expression == expression)
            .cloned())
    }

    fn list_entries(&self, user_id: UserId) -> StoreResult<Vec<Entry>> {
        let inner = self.inner.lock();
        Ok(inner
            .entries
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    fn delete_entry(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        if inner.owned(user_id, entry_id).is_none() {
            return Ok(false);
        }
        inner.entries.remove(&entry_id);
        inner.states.retain(|&(_, id), _| id != entry_id);
        inner.reviews.retain(|r| r.entry_id != entry_id);
        Ok(true)
    }

    fn memory_state(
        &self,
        user_id: UserId,
        entry_id: EntryId,
    ) -> StoreResult<Option<CardMemoryState>> {
        Ok(self.inner.lock().states.get(&(user_id, entry_id)).cloned())
    }

    fn due_candidates(&self, user_id: UserId) -> StoreResult<Vec<DueCandidate>> {
        let inner = self.inner.lock();
        Ok(inner
            .entries
            .values()
            .filter(|e| e.user_id == user_id)
            .map(|e| DueCandidate {
                item: e.to_study_item(),
                due_at: inner.states.get(&(user_id, e.id)).map(|s| s.due_at),
                created_at: e.created_at,
            })
            .collect())
    }

    fn commit_review(
        &self,
        event: ReviewEvent,
        transition: Transition<'_>,
    ) -> StoreResult<CardMemoryState> {
        let mut inner = self.inner.lock();
        if inner.owned(event.user_id, event.entry_id).is_none() {
            return Err(StoreError::NotFound(format!("entry {}", event.entry_id)));
        }

        let key = (event.user_id, event.entry_id);
        let next = transition(inner.states.get(&key));
        inner.states.insert(key, next.clone());
        inner.reviews.push(event);
        Ok(next)
    }

    fn reviews(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<Vec<ReviewEvent>> {
        let inner = self.inner.lock();
        Ok(inner
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id && r.entry_id == entry_id)
            .cloned()
            .collect())
    }
}
