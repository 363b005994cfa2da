use std::path::PathBuf;
use std::str::FromStr;

use crate::services::rate_limit::RateLimitConfig;
use crate::services::scheduler::SchedulerParams;
use crate::services::study_queue::DEFAULT_BATCH_SIZE;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Daily-rolling file output next to stdout.
    pub file_logs: bool,
    pub log_dir: PathBuf,
    pub session_batch_size: usize,
    pub scheduler: SchedulerParams,
    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logs: false,
            log_dir: PathBuf::from("./logs"),
            session_batch_size: DEFAULT_BATCH_SIZE,
            scheduler: SchedulerParams::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparsable or out-of-range
    /// values fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let scheduler_defaults = defaults.scheduler.clone();

        let log_level = lookup_trimmed(&lookup, "RUST_LOG").unwrap_or(defaults.log_level);
        let file_logs = lookup_trimmed(&lookup, "ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.file_logs);
        let log_dir = lookup_trimmed(&lookup, "LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);

        let session_batch_size =
            parse_env_where(&lookup, "SESSION_BATCH_SIZE", |&n: &usize| n >= 1)
                .unwrap_or(defaults.session_batch_size);

        let mut scheduler = SchedulerParams {
            initial_ease: parse_env_where(&lookup, "SRS_INITIAL_EASE", |v: &f64| v.is_finite())
                .unwrap_or(scheduler_defaults.initial_ease),
            min_ease: parse_env_where(&lookup, "SRS_MIN_EASE", |v: &f64| {
                v.is_finite() && *v > 0.0
            })
            .unwrap_or(scheduler_defaults.min_ease),
            max_ease: parse_env_where(&lookup, "SRS_MAX_EASE", |v: &f64| v.is_finite())
                .unwrap_or(scheduler_defaults.max_ease),
            max_interval_days: parse_env_where(&lookup, "SRS_MAX_INTERVAL_DAYS", |&v: &u32| v >= 1)
                .unwrap_or(scheduler_defaults.max_interval_days),
            again_delay_minutes: parse_env_where(&lookup, "SRS_AGAIN_DELAY_MINUTES", |&v: &i64| {
                v >= 0
            })
            .unwrap_or(scheduler_defaults.again_delay_minutes),
            hard_delay_minutes: parse_env_where(&lookup, "SRS_HARD_DELAY_MINUTES", |&v: &i64| {
                v >= 0
            })
            .unwrap_or(scheduler_defaults.hard_delay_minutes),
            ..scheduler_defaults.clone()
        };

        if scheduler.min_ease >= scheduler.max_ease {
            tracing::warn!(
                min_ease = scheduler.min_ease,
                max_ease = scheduler.max_ease,
                "ease bounds inverted, using defaults"
            );
            scheduler.min_ease = scheduler_defaults.min_ease;
            scheduler.max_ease = scheduler_defaults.max_ease;
        }
        if !(scheduler.min_ease..=scheduler.max_ease).contains(&scheduler.initial_ease) {
            tracing::warn!(
                initial_ease = scheduler.initial_ease,
                "initial ease outside bounds, clamping"
            );
            scheduler.initial_ease = scheduler
                .initial_ease
                .clamp(scheduler.min_ease, scheduler.max_ease);
        }

        let rate_limit = RateLimitConfig {
            per_minute: parse_env_where(&lookup, "LLM_RATE_LIMIT_PER_MINUTE", |&v: &u32| v >= 1)
                .unwrap_or(defaults.rate_limit.per_minute),
            per_hour: parse_env_where(&lookup, "LLM_RATE_LIMIT_PER_HOUR", |&v: &u32| v >= 1)
                .unwrap_or(defaults.rate_limit.per_hour),
        };

        Self {
            log_level,
            file_logs,
            log_dir,
            session_batch_size,
            scheduler,
            rate_limit,
        }
    }
}

/// Empty values count as unset.
fn lookup_trimmed<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup_trimmed(lookup, key)?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "ignoring unparsable config value");
            None
        }
    }
}

fn parse_env_where<T, F, P>(lookup: &F, key: &str, accept: P) -> Option<T>
where
    T: FromStr + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
    P: Fn(&T) -> bool,
{
    let parsed = parse_env::<T, F>(lookup, key)?;
    if accept(&parsed) {
        Some(parsed)
    } else {
        tracing::warn!(key, value = %parsed, "ignoring out-of-range config value");
        None
    }
}
