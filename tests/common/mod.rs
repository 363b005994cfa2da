#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

use danci_srs::services::entries::ContentGenerator;
use danci_srs::store::{MemoryStore, SrsStore};
use danci_srs::types::{Entry, GeneratedContent, NewEntry, StudyItem, UserId};
use danci_srs::SrsResult;

pub const EPS: f64 = 1e-9;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 7, 30, 0).unwrap()
}

pub fn content(meaning: &str) -> GeneratedContent {
    GeneratedContent {
        meaning: meaning.to_string(),
        examples: vec![
            "first example".to_string(),
            "second example".to_string(),
            "third example".to_string(),
        ],
        tone_tip: "neutral".to_string(),
        etymology: "unknown".to_string(),
    }
}

/// Inserts `expressions` for `user_id`, one minute apart.
pub fn seed(store: &MemoryStore, user_id: UserId, expressions: &[&str]) -> Vec<Entry> {
    expressions
        .iter()
        .enumerate()
        .map(|(i, expr)| {
            store
                .insert_entry(NewEntry {
                    user_id,
                    expression: expr.to_string(),
                    content: content(&format!("meaning of {expr}")),
                    created_at: t0() - Duration::days(1) + Duration::minutes(i as i64),
                })
                .unwrap()
        })
        .collect()
}

pub fn item(id: i64, expression: &str) -> StudyItem {
    StudyItem {
        id,
        expression: expression.to_string(),
        meaning: String::new(),
        examples: Vec::new(),
        tone_tip: String::new(),
        etymology: String::new(),
    }
}

/// Generator that accepts everything except `reject`, counting its calls.
#[derive(Default)]
pub struct StubGenerator {
    pub reject: Option<String>,
    pub calls: AtomicUsize,
}

impl StubGenerator {
    pub fn rejecting(expression: &str) -> Self {
        Self {
            reject: Some(expression.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContentGenerator for StubGenerator {
    fn classify(&self, expression: &str) -> SrsResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let valid = self.reject.as_deref() != Some(expression);
        Ok(serde_json::json!({
            "isValid": valid,
            "reason": if valid { "common idiom" } else { "not an English expression" },
        })
        .to_string())
    }

    fn generate(&self, expression: &str) -> SrsResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::to_string(&content(&format!("meaning of {expression}"))).unwrap())
    }
}
