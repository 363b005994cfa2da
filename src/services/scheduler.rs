use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CardMemoryState, Rating, DEFAULT_EASE_FACTOR};

/// Guards `ceil` against float noise such as `10.0 * 1.2 == 12.000000000000002`.
const INTERVAL_EPSILON: f64 = 1e-9;
const MAX_DELAY_MINUTES: i64 = 7 * 24 * 60;

/// Tunables of the SM-2 variant. `Default` holds the production constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerParams {
    pub initial_ease: f64,
    pub min_ease: f64,
    pub max_ease: f64,
    pub again_ease_delta: f64,
    pub hard_ease_delta: f64,
    pub easy_ease_delta: f64,
    pub hard_interval_multiplier: f64,
    pub easy_bonus: f64,
    pub first_good_interval_days: u32,
    pub first_easy_interval_days: u32,
    pub max_interval_days: u32,
    pub again_delay_minutes: i64,
    pub hard_delay_minutes: i64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            initial_ease: DEFAULT_EASE_FACTOR,
            min_ease: 1.3,
            max_ease: 3.0,
            again_ease_delta: -0.2,
            hard_ease_delta: -0.15,
            easy_ease_delta: 0.1,
            hard_interval_multiplier: 1.2,
            easy_bonus: 0.3,
            first_good_interval_days: 1,
            first_easy_interval_days: 2,
            max_interval_days: 36_500,
            again_delay_minutes: 5,
            hard_delay_minutes: 10,
        }
    }
}

impl SchedulerParams {
    pub fn initial_state(&self, now: DateTime<Utc>) -> CardMemoryState {
        CardMemoryState::with_ease(self.initial_ease, now)
    }

    fn ease_delta(&self, rating: Rating) -> f64 {
        match rating {
            Rating::Again => self.again_ease_delta,
            Rating::Hard => self.hard_ease_delta,
            Rating::Good => 0.0,
            Rating::Easy => self.easy_ease_delta,
        }
    }

    fn short_term_delay(&self, rating: Rating) -> Duration {
        match rating {
            Rating::Again => delay_minutes(self.again_delay_minutes),
            Rating::Hard => delay_minutes(self.hard_delay_minutes),
            Rating::Good | Rating::Easy => Duration::zero(),
        }
    }

    fn clamp_ease(&self, ease: f64) -> f64 {
        // `f64::clamp` panics when min > max
        ease.max(self.min_ease).min(self.max_ease)
    }
}

fn delay_minutes(minutes: i64) -> Duration {
    Duration::minutes(minutes.clamp(0, MAX_DELAY_MINUTES))
}

/// Next memory state after `rating`, with the default parameters.
pub fn apply_rating(state: &CardMemoryState, rating: Rating, now: DateTime<Utc>) -> CardMemoryState {
    apply_rating_with(&SchedulerParams::default(), state, rating, now)
}

pub fn apply_rating_with(
    params: &SchedulerParams,
    state: &CardMemoryState,
    rating: Rating,
    now: DateTime<Utc>,
) -> CardMemoryState {
    let ease = if state.ease_factor.is_finite() {
        state.ease_factor
    } else {
        params.initial_ease
    };
    let first_repetition = state.repetitions == 0;
    let previous = f64::from(state.interval_days);

    let (repetitions, interval_days, lapses) = match rating {
        Rating::Again => (0, 0, state.lapses.saturating_add(1)),
        Rating::Hard => (
            state.repetitions.saturating_add(1),
            grow_interval(previous, params.hard_interval_multiplier),
            state.lapses,
        ),
        Rating::Good => {
            let interval = if first_repetition {
                params.first_good_interval_days
            } else {
                grow_interval(previous, ease)
            };
            (state.repetitions.saturating_add(1), interval, state.lapses)
        }
        Rating::Easy => {
            let interval = if first_repetition {
                params.first_easy_interval_days
            } else {
                grow_interval(previous, ease + params.easy_bonus)
            };
            (state.repetitions.saturating_add(1), interval, state.lapses)
        }
    };
    let interval_days = interval_days.min(params.max_interval_days);
    let ease_factor = params.clamp_ease(ease + params.ease_delta(rating));

    let offset = Duration::days(i64::from(interval_days)) + params.short_term_delay(rating);
    let due_at = now
        .checked_add_signed(offset)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    tracing::debug!(
        rating = %rating,
        ease_before = state.ease_factor,
        ease_after = ease_factor,
        interval_before = state.interval_days,
        interval_after = interval_days,
        repetitions,
        lapses,
        "scheduler transition"
    );

    CardMemoryState {
        ease_factor,
        interval_days,
        repetitions,
        lapses,
        due_at,
        last_reviewed_at: Some(now),
    }
}

/// `max(1, ceil(previous * factor))`, saturating at `u32::MAX`.
fn grow_interval(previous: f64, factor: f64) -> u32 {
    let raw = (previous * factor - INTERVAL_EPSILON).ceil();
    if raw.is_nan() || raw < 1.0 {
        1
    } else if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        raw as u32
    }
}
