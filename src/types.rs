use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SrsError;

pub type UserId = i64;
pub type EntryId = i64;

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

// ========== Rating ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }

    /// 0 for `again` up to 3 for `easy`.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Again => 0,
            Self::Hard => 1,
            Self::Good => 2,
            Self::Easy => 3,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Again)
    }

    /// Ratings that keep the card in the current session.
    pub fn requeues(&self) -> bool {
        matches!(self, Self::Again | Self::Hard)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = SrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            other => Err(SrsError::validation(format!("unknown rating `{other}`"))),
        }
    }
}

// ========== Memory state ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMemoryState {
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub lapses: u32,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl CardMemoryState {
    /// State of a card that has never been reviewed.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_ease(DEFAULT_EASE_FACTOR, now)
    }

    pub fn with_ease(ease_factor: f64, now: DateTime<Utc>) -> Self {
        Self {
            ease_factor,
            interval_days: 0,
            repetitions: 0,
            lapses: 0,
            due_at: now,
            last_reviewed_at: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.last_reviewed_at.is_none()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

// ========== Entries ==========

/// Card content shown during a study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyItem {
    pub id: EntryId,
    pub expression: String,
    pub meaning: String,
    pub examples: Vec<String>,
    pub tone_tip: String,
    pub etymology: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub user_id: UserId,
    pub expression: String,
    pub meaning: String,
    pub examples: Vec<String>,
    pub tone_tip: String,
    pub etymology: String,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn to_study_item(&self) -> StudyItem {
        StudyItem {
            id: self.id,
            expression: self.expression.clone(),
            meaning: self.meaning.clone(),
            examples: self.examples.clone(),
            tone_tip: self.tone_tip.clone(),
            etymology: self.etymology.clone(),
        }
    }
}

/// Generated explanation for an expression, as returned by the content collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub meaning: String,
    pub examples: Vec<String>,
    pub tone_tip: String,
    pub etymology: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub user_id: UserId,
    pub expression: String,
    pub content: GeneratedContent,
    pub created_at: DateTime<Utc>,
}

// ========== Review log ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub user_id: UserId,
    pub entry_id: EntryId,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
}
