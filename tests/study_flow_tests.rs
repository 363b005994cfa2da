//! End-to-end flows: scheduling scenarios, the session driver over a store,
//! and entry creation behind the generation quota.

mod common;

use std::sync::Arc;

use chrono::Duration;

use common::{item, seed, t0, StubGenerator, EPS};
use danci_srs::config::Config;
use danci_srs::services::entries::EntryService;
use danci_srs::services::rate_limit::{ActorKey, RateLimitConfig, RateLimiter};
use danci_srs::services::review::ReviewService;
use danci_srs::services::study_session::StudySession;
use danci_srs::store::{MemoryStore, SrsStore};
use danci_srs::{apply_rating, next_queue, CardMemoryState, Rating, SrsError};

fn state(ef: f64, interval_days: u32, repetitions: u32, lapses: u32) -> CardMemoryState {
    CardMemoryState {
        ease_factor: ef,
        interval_days,
        repetitions,
        lapses,
        ..CardMemoryState::new(t0())
    }
}

// ============================================================================
// Scheduling scenarios
// ============================================================================

#[test]
fn scenario_new_card_rated_good() {
    let next = apply_rating(&state(2.5, 0, 0, 0), Rating::Good, t0());
    assert!((next.ease_factor - 2.5).abs() < EPS);
    assert_eq!(
        (next.interval_days, next.repetitions, next.lapses),
        (1, 1, 0)
    );
    assert_eq!(next.due_at, t0() + Duration::days(1));
}

#[test]
fn scenario_new_card_rated_again() {
    let next = apply_rating(&state(2.5, 0, 0, 0), Rating::Again, t0());
    assert!((next.ease_factor - 2.3).abs() < EPS);
    assert_eq!(
        (next.interval_days, next.repetitions, next.lapses),
        (0, 0, 1)
    );
    assert_eq!(next.due_at, t0() + Duration::minutes(5));
}

#[test]
fn scenario_mature_card_rated_easy() {
    let next = apply_rating(&state(2.5, 10, 3, 0), Rating::Easy, t0());
    assert_eq!(next.interval_days, 28);
    assert!((next.ease_factor - 2.6).abs() < EPS);
    assert_eq!(next.due_at, t0() + Duration::days(28));
}

#[test]
fn scenario_hard_requeues_behind_next() {
    let rest = vec![item(1, "a"), item(2, "b"), item(3, "c")];
    let ids: Vec<i64> = next_queue(item(9, "current"), rest, Rating::Hard)
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec![1, 9, 2, 3]);
}

#[test]
fn scenario_again_on_last_card_ends_session() {
    assert!(next_queue(item(9, "current"), Vec::new(), Rating::Again).is_empty());
}

// ============================================================================
// Session driver
// ============================================================================

fn review_service(store: Arc<MemoryStore>) -> ReviewService<Arc<MemoryStore>> {
    ReviewService::from_config(store, &Config::default())
}

#[test]
fn session_starts_with_new_cards_in_creation_order() {
    let store = Arc::new(MemoryStore::new());
    let entries = seed(&store, 1, &["hit the sack", "on the fence", "spill the beans"]);
    seed(&store, 2, &["under the weather"]);

    let service = review_service(Arc::clone(&store));
    let session = StudySession::start(&service, 1, t0()).unwrap();
    let ids: Vec<i64> = session.items().iter().map(|i| i.id).collect();
    assert_eq!(ids, entries.iter().map(|e| e.id).collect::<Vec<_>>());
    assert!(session.is_active());
    assert!(!session.is_revealed());
}

#[test]
fn session_reorders_and_persists_each_rating() {
    let store = Arc::new(MemoryStore::new());
    let entries = seed(&store, 1, &["a", "b", "c"]);
    let (a, b, c) = (entries[0].id, entries[1].id, entries[2].id);
    let service = review_service(Arc::clone(&store));
    let mut session = StudySession::start(&service, 1, t0()).unwrap();

    session.reveal();
    assert!(session.is_revealed());
    session.rate(&service, Rating::Hard, t0()).unwrap();
    assert!(!session.is_revealed());
    let ids: Vec<i64> = session.items().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![b, a, c]);

    session.rate(&service, Rating::Good, t0()).unwrap();
    session.rate(&service, Rating::Again, t0()).unwrap();
    let ids: Vec<i64> = session.items().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![a, c]);

    let outcome = session.rate(&service, Rating::Easy, t0()).unwrap().unwrap();
    assert_eq!(outcome.entry_id, a);
    assert_eq!(outcome.state.lapses, 1);
    assert_eq!(outcome.state.repetitions, 1);
    assert_eq!(outcome.state.interval_days, 2);

    session.rate(&service, Rating::Good, t0()).unwrap();
    assert!(!session.is_active());
    assert!(session.rate(&service, Rating::Good, t0()).unwrap().is_none());

    assert_eq!(store.reviews(1, a).unwrap().len(), 3);
    assert_eq!(store.reviews(1, b).unwrap().len(), 1);
    assert_eq!(store.reviews(1, c).unwrap().len(), 1);
}

#[test]
fn failed_submission_keeps_queue() {
    let store = Arc::new(MemoryStore::new());
    let entries = seed(&store, 1, &["a", "b"]);
    let service = review_service(Arc::clone(&store));
    let mut session = StudySession::start(&service, 1, t0()).unwrap();

    assert!(store.delete_entry(1, entries[0].id).unwrap());
    let err = session.rate(&service, Rating::Good, t0()).unwrap_err();
    assert!(matches!(err, SrsError::NotFound(_)));
    assert_eq!(session.items().len(), 2);
    assert_eq!(session.current().map(|i| i.id), Some(entries[0].id));
}

#[test]
fn next_session_orders_by_due_date() {
    let store = Arc::new(MemoryStore::new());
    let entries = seed(&store, 1, &["a", "b", "c", "d"]);
    let service = review_service(Arc::clone(&store));

    service.submit_review(1, entries[0].id, Rating::Good, t0()).unwrap();
    service.submit_review(1, entries[1].id, Rating::Again, t0()).unwrap();
    service.submit_review(1, entries[2].id, Rating::Hard, t0()).unwrap();

    let later = t0() + Duration::days(2);
    let ids: Vec<i64> = service
        .start_session(1, later)
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    // d never reviewed, then b (+5min), a (+1 day), c (+1 day 10min)
    assert_eq!(
        ids,
        vec![entries[3].id, entries[1].id, entries[0].id, entries[2].id]
    );
}

#[test]
fn session_batch_respects_config() {
    let store = Arc::new(MemoryStore::new());
    let names: Vec<String> = (0..40).map(|i| format!("expr {i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    seed(&store, 1, &refs);

    let default_batch = review_service(Arc::clone(&store)).start_session(1, t0()).unwrap();
    assert_eq!(default_batch.len(), 30);

    let config = Config {
        session_batch_size: 5,
        ..Config::default()
    };
    let small = ReviewService::from_config(Arc::clone(&store), &config);
    assert_eq!(small.start_session(1, t0()).unwrap().len(), 5);
}

#[test]
fn concurrent_reviews_of_one_card_are_not_lost() {
    const THREADS: usize = 8;
    const RATINGS_PER_THREAD: usize = 50;

    let store = Arc::new(MemoryStore::new());
    let id = seed(&store, 1, &["under the weather"])[0].id;
    let service = Arc::new(review_service(Arc::clone(&store)));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                for _ in 0..RATINGS_PER_THREAD {
                    service.submit_review(1, id, Rating::Again, t0()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = THREADS * RATINGS_PER_THREAD;
    let state = store.memory_state(1, id).unwrap().unwrap();
    assert_eq!(state.lapses as usize, total);
    assert_eq!(state.repetitions, 0);
    assert_eq!(store.reviews(1, id).unwrap().len(), total);
}

// ============================================================================
// Entry creation
// ============================================================================

fn entry_service(
    store: Arc<MemoryStore>,
    generator: Arc<StubGenerator>,
    per_minute: u32,
) -> EntryService<Arc<MemoryStore>, Arc<StubGenerator>> {
    let limiter = RateLimiter::new(RateLimitConfig {
        per_minute,
        per_hour: 300,
    });
    EntryService::new(store, generator, limiter)
}

#[test]
fn adding_existing_expression_skips_generation() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator::default());
    let service = entry_service(Arc::clone(&store), Arc::clone(&generator), 10);
    let actor = ActorKey::User(1);

    let first = service.add(1, &actor, "  break the ice ", t0()).unwrap();
    assert!(!first.existed);
    assert_eq!(first.entry.expression, "break the ice");
    assert_eq!(generator.call_count(), 2);

    let second = service.add(1, &actor, "break the ice", t0()).unwrap();
    assert!(second.existed);
    assert_eq!(second.entry.id, first.entry.id);
    assert_eq!(generator.call_count(), 2);
}

#[test]
fn rejected_expression_is_validation_error() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator::rejecting("qwzx"));
    let service = entry_service(Arc::clone(&store), generator, 10);

    let err = service.add(1, &ActorKey::User(1), "qwzx", t0()).unwrap_err();
    assert!(matches!(err, SrsError::Validation(ref reason) if reason.contains("not an English")));
    assert!(service.list(1).unwrap().is_empty());

    let err = service.add(1, &ActorKey::User(1), "   ", t0()).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn long_expression_is_accepted() {
    let store = Arc::new(MemoryStore::new());
    let service = entry_service(Arc::clone(&store), Arc::new(StubGenerator::default()), 10);
    let expression = "once in a blue moon ".repeat(20);

    let added = service.add(1, &ActorKey::User(1), &expression, t0()).unwrap();
    assert!(!added.existed);
    assert_eq!(added.entry.expression, expression.trim());
}

#[test]
fn generation_quota_is_enforced_per_actor() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator::default());
    let service = entry_service(Arc::clone(&store), Arc::clone(&generator), 2);
    let actor = ActorKey::User(1);

    service.add(1, &actor, "one", t0()).unwrap();
    service.add(1, &actor, "two", t0()).unwrap();
    let err = service.add(1, &actor, "three", t0()).unwrap_err();
    assert!(matches!(err, SrsError::RateLimited { retry_after_secs: 60 }));
    assert_eq!(generator.call_count(), 4);

    // existing expressions are served without touching the quota
    assert!(service.add(1, &actor, "one", t0()).unwrap().existed);
    assert!(service.add(2, &ActorKey::User(2), "three", t0()).is_ok());
    assert!(service
        .add(1, &actor, "three", t0() + Duration::minutes(1))
        .is_ok());
}

#[test]
fn deleting_entry_removes_it_from_sessions() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator::default());
    let entries = entry_service(Arc::clone(&store), generator, 10);
    let reviews = review_service(Arc::clone(&store));

    let added = entries.add(1, &ActorKey::User(1), "at the drop of a hat", t0()).unwrap();
    reviews.submit_review(1, added.entry.id, Rating::Again, t0()).unwrap();

    assert!(matches!(entries.delete(2, added.entry.id), Err(SrsError::NotFound(_))));
    entries.delete(1, added.entry.id).unwrap();
    assert!(matches!(entries.get(1, added.entry.id), Err(SrsError::NotFound(_))));
    assert!(reviews
        .start_session(1, t0() + Duration::days(1))
        .unwrap()
        .is_empty());
    assert!(store.memory_state(1, added.entry.id).unwrap().is_none());
}
