//! Persistence boundary.
//!
//! The scheduling core never talks to a database directly; it goes through
//! [`SrsStore`]. A store must make [`SrsStore::commit_review`] atomic: the review
//! event is appended and the memory state rewritten under one write, so racing
//! ratings of the same card cannot silently drop an update.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::services::study_queue::{order_due_cards, DueCandidate};
use crate::types::{CardMemoryState, Entry, EntryId, NewEntry, ReviewEvent, StudyItem, UserId};

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Computes the next memory state from the stored one (`None` for a card never reviewed).
pub type Transition<'a> = &'a dyn Fn(Option<&CardMemoryState>) -> CardMemoryState;

pub trait SrsStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the user already saved the expression.
    fn insert_entry(&self, entry: NewEntry) -> StoreResult<Entry>;

    /// Entry lookup scoped to its owner.
    fn find_entry(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<Option<Entry>>;

    fn find_entry_by_expression(
        &self,
        user_id: UserId,
        expression: &str,
    ) -> StoreResult<Option<Entry>>;

    fn list_entries(&self, user_id: UserId) -> StoreResult<Vec<Entry>>;

    /// Removes the entry with its memory state and review events.
    fn delete_entry(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<bool>;

    fn memory_state(
        &self,
        user_id: UserId,
        entry_id: EntryId,
    ) -> StoreResult<Option<CardMemoryState>>;

    /// Every entry of the user with its scheduling timestamps.
    fn due_candidates(&self, user_id: UserId) -> StoreResult<Vec<DueCandidate>>;

    /// Session batch. Stores with a query engine should override this with an
    /// equivalent query; the ordering must match [`order_due_cards`].
    fn due_items(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<StudyItem>> {
        Ok(order_due_cards(self.due_candidates(user_id)?, now, limit))
    }

    /// Appends `event` and replaces the card's memory state with `transition`'s
    /// result in one atomic step.
    fn commit_review(
        &self,
        event: ReviewEvent,
        transition: Transition<'_>,
    ) -> StoreResult<CardMemoryState>;

    /// Review events of one entry, oldest first.
    fn reviews(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<Vec<ReviewEvent>>;
}

impl<T: SrsStore + ?Sized> SrsStore for std::sync::Arc<T> {
    fn insert_entry(&self, entry: NewEntry) -> StoreResult<Entry> {
        (**self).insert_entry(entry)
    }

    fn find_entry(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<Option<Entry>> {
        (**self).find_entry(user_id, entry_id)
    }

    fn find_entry_by_expression(
        &self,
        user_id: UserId,
        expression: &str,
    ) -> StoreResult<Option<Entry>> {
        (**self).find_entry_by_expression(user_id, expression)
    }

    fn list_entries(&self, user_id: UserId) -> StoreResult<Vec<Entry>> {
        (**self).list_entries(user_id)
    }

    fn delete_entry(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<bool> {
        (**self).delete_entry(user_id, entry_id)
    }

    fn memory_state(
        &self,
        user_id: UserId,
        entry_id: EntryId,
    ) -> StoreResult<Option<CardMemoryState>> {
        (**self).memory_state(user_id, entry_id)
    }

    fn due_candidates(&self, user_id: UserId) -> StoreResult<Vec<DueCandidate>> {
        (**self).due_candidates(user_id)
    }

    fn due_items(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<StudyItem>> {
        (**self).due_items(user_id, now, limit)
    }

    fn commit_review(
        &self,
        event: ReviewEvent,
        transition: Transition<'_>,
    ) -> StoreResult<CardMemoryState> {
        (**self).commit_review(event, transition)
    }

    fn reviews(&self, user_id: UserId, entry_id: EntryId) -> StoreResult<Vec<ReviewEvent>> {
        (**self).reviews(user_id, entry_id)
    }
}
