use chrono::{DateTime, Utc};

use crate::error::SrsResult;
use crate::services::review::{ReviewOutcome, ReviewService};
use crate::services::study_queue::next_queue;
use crate::store::SrsStore;
use crate::types::{Rating, StudyItem, UserId};

/// Session-local state of one study run: the short-term queue plus whether the
/// head card's answer is showing.
#[derive(Debug, Clone, Default)]
pub struct StudySession {
    user_id: UserId,
    queue: Vec<StudyItem>,
    revealed: bool,
}

impl StudySession {
    pub fn start<S: SrsStore>(
        service: &ReviewService<S>,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> SrsResult<Self> {
        let queue = service.start_session(user_id, now)?;
        Ok(Self::with_items(user_id, queue))
    }

    pub fn with_items(user_id: UserId, queue: Vec<StudyItem>) -> Self {
        Self {
            user_id,
            queue,
            revealed: false,
        }
    }

    pub fn current(&self) -> Option<&StudyItem> {
        self.queue.first()
    }

    pub fn items(&self) -> &[StudyItem] {
        &self.queue
    }

    pub fn is_active(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn reveal(&mut self) {
        if self.is_active() {
            self.revealed = true;
        }
    }

    /// Rates the head card. The queue only advances once the review is stored,
    /// so a failed submission can be retried on the same card.
    pub fn rate<S: SrsStore>(
        &mut self,
        service: &ReviewService<S>,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> SrsResult<Option<ReviewOutcome>> {
        let Some(current) = self.queue.first() else {
            return Ok(None);
        };
        let outcome = service.submit_review(self.user_id, current.id, rating, now)?;

        let mut rest = std::mem::take(&mut self.queue);
        let current = rest.remove(0);
        self.queue = next_queue(current, rest, rating);
        self.revealed = false;

        if self.queue.is_empty() {
            tracing::info!(user_id = self.user_id, "study session finished");
        }
        Ok(Some(outcome))
    }
}
