//! Mock Moderator for testing.

use async_trait::async_trait;
use serde_json::{json, Map};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::moderation::ModerationVerdict;
use crate::ports::{ModerationError, Moderator};

/// Flags messages containing configured terms; can be set to fail.
#[derive(Debug, Clone, Default)]
pub struct MockModerator {
    flagged_terms: HashSet<String>,
    fail: bool,
    delay: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockModerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags any message containing `term` (case-insensitive).
    pub fn flagging(mut self, term: &str) -> Self {
        self.flagged_terms.insert(term.to_lowercase());
        self
    }

    /// Makes every call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Moderator for MockModerator {
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        lock(&self.calls).push(text.to_string());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.fail {
            return Err(ModerationError::Unavailable("mock moderation failure".to_string()));
        }

        let lowered = text.to_lowercase();
        if self.flagged_terms.iter().any(|term| lowered.contains(term)) {
            let mut categories = Map::new();
            categories.insert("harassment".to_string(), json!(true));
            return Ok(ModerationVerdict::flagged(categories));
        }
        Ok(ModerationVerdict::safe())
    }
}
