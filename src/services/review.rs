use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::{SrsError, SrsResult, StoreError};
use crate::services::scheduler::{apply_rating_with, SchedulerParams};
use crate::store::SrsStore;
use crate::types::{CardMemoryState, EntryId, Rating, ReviewEvent, StudyItem, UserId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub entry_id: EntryId,
    pub rating: Rating,
    pub state: CardMemoryState,
}

/// Starts sessions and records ratings against a store.
pub struct ReviewService<S> {
    store: S,
    params: SchedulerParams,
    batch_size: usize,
}

impl<S: SrsStore> ReviewService<S> {
    pub fn new(store: S, params: SchedulerParams, batch_size: usize) -> Self {
        Self {
            store,
            params,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(store, config.scheduler.clone(), config.session_batch_size)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    /// Due cards for a new session, in presentation order.
    pub fn start_session(&self, user_id: UserId, now: DateTime<Utc>) -> SrsResult<Vec<StudyItem>> {
        let items = self.store.due_items(user_id, now, self.batch_size)?;
        tracing::info!(user_id, batch = items.len(), "study session started");
        Ok(items)
    }

    /// Logs the review and persists the rescheduled memory state atomically.
    pub fn submit_review(
        &self,
        user_id: UserId,
        entry_id: EntryId,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> SrsResult<ReviewOutcome> {
        self.ensure_owned(user_id, entry_id)?;

        let event = ReviewEvent {
            user_id,
            entry_id,
            rating,
            reviewed_at: now,
        };
        let params = &self.params;
        let state = self
            .store
            .commit_review(event, &|previous| {
                let current = previous
                    .cloned()
                    .unwrap_or_else(|| params.initial_state(now));
                apply_rating_with(params, &current, rating, now)
            })
            .map_err(|err| match err {
                StoreError::NotFound(_) => SrsError::not_found("entry not found"),
                other => SrsError::Store(other),
            })?;

        tracing::info!(
            user_id,
            entry_id,
            rating = %rating,
            interval_days = state.interval_days,
            due_at = %state.due_at,
            "review committed"
        );

        Ok(ReviewOutcome {
            entry_id,
            rating,
            state,
        })
    }

    pub fn memory_state(
        &self,
        user_id: UserId,
        entry_id: EntryId,
    ) -> SrsResult<Option<CardMemoryState>> {
        self.ensure_owned(user_id, entry_id)?;
        Ok(self.store.memory_state(user_id, entry_id)?)
    }

    pub fn review_history(&self, user_id: UserId, entry_id: EntryId) -> SrsResult<Vec<ReviewEvent>> {
        self.ensure_owned(user_id, entry_id)?;
        Ok(self.store.reviews(user_id, entry_id)?)
    }

    fn ensure_owned(&self, user_id: UserId, entry_id: EntryId) -> SrsResult<()> {
        if self.store.find_entry(user_id, entry_id)?.is_none() {
            tracing::warn!(user_id, entry_id, "entry missing or not owned");
            return Err(SrsError::not_found("entry not found"));
        }
        Ok(())
    }
}
