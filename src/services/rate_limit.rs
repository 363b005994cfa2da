use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

const MINUTE_WINDOW_MS: i64 = 60_000;
const HOUR_WINDOW_MS: i64 = 60 * 60_000;

pub const DEFAULT_PER_MINUTE: u32 = 10;
pub const DEFAULT_PER_HOUR: u32 = 300;

/// Identity a quota is charged to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActorKey {
    User(i64),
    Ip(String),
}

impl ActorKey {
    /// Authenticated users are keyed by id, anonymous callers by client address.
    pub fn resolve(user_id: Option<i64>, forwarded_for: Option<&str>) -> Self {
        match user_id {
            Some(id) => Self::User(id),
            None => {
                let ip = forwarded_for
                    .and_then(|raw| raw.split(',').next())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("unknown");
                Self::Ip(ip.to_string())
            }
        }
    }
}

impl fmt::Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Ip(ip) => write!(f, "ip:{ip}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_minute: u32,
    pub per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: DEFAULT_PER_MINUTE,
            per_hour: DEFAULT_PER_HOUR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub retry_after_secs: u64,
    pub remaining_minute: u32,
    pub remaining_hour: u32,
}

/// Sliding-log timestamps of one actor, oldest first.
#[derive(Debug, Default)]
struct Bucket {
    minute: VecDeque<DateTime<Utc>>,
    hour: VecDeque<DateTime<Utc>>,
}

impl Bucket {
    fn prune(&mut self, now: DateTime<Utc>) {
        let minute = Duration::milliseconds(MINUTE_WINDOW_MS);
        let hour = Duration::milliseconds(HOUR_WINDOW_MS);
        while self.minute.front().is_some_and(|&ts| now - ts >= minute) {
            self.minute.pop_front();
        }
        while self.hour.front().is_some_and(|&ts| now - ts >= hour) {
            self.hour.pop_front();
        }
    }

    fn is_empty(&self) -> bool {
        self.minute.is_empty() && self.hour.is_empty()
    }
}

/// Per-actor quota on expensive calls, with a one-minute and a one-hour window.
///
/// Owned by whoever guards the call and passed in explicitly; there is no global
/// instance.
#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<ActorKey, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Records a hit for `key` unless either window is full. Rejected calls
    /// consume nothing.
    pub fn check_and_consume(&self, key: &ActorKey, now: DateTime<Utc>) -> RateLimitDecision {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key.clone()).or_default();
        bucket.prune(now);

        let minute_count = bucket.minute.len() as u32;
        let hour_count = bucket.hour.len() as u32;
        let over_minute = minute_count >= self.config.per_minute;
        let over_hour = hour_count >= self.config.per_hour;

        if over_minute || over_hour {
            let mut retry_after_ms = 0;
            if over_minute {
                if let Some(&oldest) = bucket.minute.front() {
                    retry_after_ms = retry_after_ms
                        .max(MINUTE_WINDOW_MS - (now - oldest).num_milliseconds());
                }
            }
            if over_hour {
                if let Some(&oldest) = bucket.hour.front() {
                    retry_after_ms =
                        retry_after_ms.max(HOUR_WINDOW_MS - (now - oldest).num_milliseconds());
                }
            }
            let retry_after_secs = ((retry_after_ms.max(0) as u64) + 999) / 1000;
            tracing::warn!(actor = %key, retry_after_secs, "rate limit exceeded");
            return RateLimitDecision {
                allowed: false,
                retry_after_secs: retry_after_secs.max(1),
                remaining_minute: self.config.per_minute.saturating_sub(minute_count),
                remaining_hour: self.config.per_hour.saturating_sub(hour_count),
            };
        }

        bucket.minute.push_back(now);
        bucket.hour.push_back(now);
        RateLimitDecision {
            allowed: true,
            retry_after_secs: 0,
            remaining_minute: self.config.per_minute - (minute_count + 1),
            remaining_hour: self.config.per_hour - (hour_count + 1),
        }
    }

    /// Drops expired hits and forgets actors with nothing left in either window.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            bucket.prune(now);
            !bucket.is_empty()
        });
        before - buckets.len()
    }

    pub fn tracked_actors(&self) -> usize {
        self.buckets.lock().len()
    }
}
