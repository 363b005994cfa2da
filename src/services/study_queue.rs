use chrono::{DateTime, Utc};

use crate::types::{Rating, StudyItem};

pub const DEFAULT_BATCH_SIZE: usize = 30;

/// Reorders the session queue after the head card was rated.
///
/// `rest` is the queue with `current` already removed. `good`/`easy` retire the
/// card for this session; `again` puts it back in front and `hard` behind the next
/// card. When nothing else is left the session ends.
pub fn next_queue<T>(current: T, mut rest: Vec<T>, rating: Rating) -> Vec<T> {
    if !rating.requeues() || rest.is_empty() {
        return rest;
    }
    let position = match rating {
        Rating::Again => 0,
        _ => rest.len().min(1),
    };
    rest.insert(position, current);
    rest
}

/// A card as seen by the due query: content plus its scheduling timestamps.
#[derive(Debug, Clone)]
pub struct DueCandidate {
    pub item: StudyItem,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DueCandidate {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at.map_or(true, |due| due <= now)
    }
}

/// Selects the session batch: never-scheduled cards first, then by due date,
/// creation time and id.
pub fn order_due_cards(
    candidates: Vec<DueCandidate>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<StudyItem> {
    let mut due: Vec<DueCandidate> = candidates.into_iter().filter(|c| c.is_due(now)).collect();
    due.sort_by(|a, b| {
        a.due_at
            .is_some()
            .cmp(&b.due_at.is_some())
            .then_with(|| a.due_at.cmp(&b.due_at))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.item.id.cmp(&b.item.id))
    });
    due.into_iter().take(limit).map(|c| c.item).collect()
}
