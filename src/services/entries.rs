use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SrsError, SrsResult, StoreError};
use crate::services::rate_limit::{ActorKey, RateLimiter};
use crate::store::SrsStore;
use crate::types::{Entry, EntryId, GeneratedContent, NewEntry, UserId};

const MIN_EXAMPLES: usize = 3;

/// Gatekeeper verdict on whether an expression is worth saving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_valid: bool,
    pub reason: String,
}

impl Classification {
    pub fn from_json(raw: &str) -> SrsResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| SrsError::Generation(format!("malformed classification: {e}")))
    }
}

impl GeneratedContent {
    /// Parses the generator's structured reply.
    pub fn from_json(raw: &str) -> SrsResult<Self> {
        let content: Self = serde_json::from_str(raw)
            .map_err(|e| SrsError::Generation(format!("malformed generated entry: {e}")))?;
        if content.meaning.trim().is_empty() {
            return Err(SrsError::Generation("generated entry has no meaning".into()));
        }
        if content.examples.len() < MIN_EXAMPLES {
            return Err(SrsError::Generation(format!(
                "expected at least {MIN_EXAMPLES} examples, got {}",
                content.examples.len()
            )));
        }
        Ok(content)
    }
}

/// Language-model collaborator. Both calls return the model's structured text.
pub trait ContentGenerator: Send + Sync {
    fn classify(&self, expression: &str) -> SrsResult<String>;
    fn generate(&self, expression: &str) -> SrsResult<String>;
}

impl<T: ContentGenerator + ?Sized> ContentGenerator for std::sync::Arc<T> {
    fn classify(&self, expression: &str) -> SrsResult<String> {
        (**self).classify(expression)
    }

    fn generate(&self, expression: &str) -> SrsResult<String> {
        (**self).generate(expression)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedEntry {
    pub existed: bool,
    pub entry: Entry,
}

pub struct EntryService<S, G> {
    store: S,
    generator: G,
    limiter: RateLimiter,
}

impl<S: SrsStore, G: ContentGenerator> EntryService<S, G> {
    pub fn new(store: S, generator: G, limiter: RateLimiter) -> Self {
        Self {
            store,
            generator,
            limiter,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Saves `expression` for the user, generating its content on first sight.
    pub fn add(
        &self,
        user_id: UserId,
        actor: &ActorKey,
        expression: &str,
        now: DateTime<Utc>,
    ) -> SrsResult<AddedEntry> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(SrsError::validation("expression must not be empty"));
        }

        if let Some(entry) = self.store.find_entry_by_expression(user_id, expression)? {
            return Ok(AddedEntry {
                existed: true,
                entry,
            });
        }

        let decision = self.limiter.check_and_consume(actor, now);
        if !decision.allowed {
            return Err(SrsError::RateLimited {
                retry_after_secs: decision.retry_after_secs,
            });
        }

        let classification = Classification::from_json(&self.generator.classify(expression)?)?;
        if !classification.is_valid {
            return Err(SrsError::Validation(classification.reason));
        }
        let content = GeneratedContent::from_json(&self.generator.generate(expression)?)?;

        let inserted = self.store.insert_entry(NewEntry {
            user_id,
            expression: expression.to_string(),
            content,
            created_at: now,
        });
        match inserted {
            Ok(entry) => {
                tracing::info!(user_id, entry_id = entry.id, "entry saved");
                Ok(AddedEntry {
                    existed: false,
                    entry,
                })
            }
            // lost a race with a concurrent add of the same expression
            Err(StoreError::Conflict(_)) => {
                let entry = self
                    .store
                    .find_entry_by_expression(user_id, expression)?
                    .ok_or_else(|| SrsError::not_found("entry not found"))?;
                Ok(AddedEntry {
                    existed: true,
                    entry,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn list(&self, user_id: UserId) -> SrsResult<Vec<Entry>> {
        Ok(self.store.list_entries(user_id)?)
    }

    pub fn get(&self, user_id: UserId, entry_id: EntryId) -> SrsResult<Entry> {
        self.store
            .find_entry(user_id, entry_id)?
            .ok_or_else(|| SrsError::not_found("entry not found"))
    }

    pub fn delete(&self, user_id: UserId, entry_id: EntryId) -> SrsResult<()> {
        if !self.store.delete_entry(user_id, entry_id)? {
            return Err(SrsError::not_found("entry not found"));
        }
        tracing::info!(user_id, entry_id, "entry deleted");
        Ok(())
    }
}
