pub mod entries;
pub mod rate_limit;
pub mod review;
pub mod scheduler;
pub mod study_queue;
pub mod study_session;
