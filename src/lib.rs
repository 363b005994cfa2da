//! Spaced-repetition core of the Danci vocabulary app.
//!
//! [`services::scheduler`] turns a rating into the card's next long-term state,
//! [`services::study_queue`] decides what the current session shows next. The rest
//! of the crate wires both to a store, a content generator and a quota.

pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod store;
pub mod types;

pub use error::{SrsError, SrsResult, StoreError};
pub use services::scheduler::{apply_rating, apply_rating_with, SchedulerParams};
pub use services::study_queue::next_queue;
pub use types::{CardMemoryState, Rating, StudyItem};
