//! Generated content cache entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::fingerprint::ContentFingerprint;
use crate::domain::foundation::{StateMachine, ValidationError};

/// Storage key of the generated content cache.
pub const CONTENT_STORAGE_KEY: &str = "generated-content-store";

/// Lifecycle of one cached generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Generating,
    Generated,
    Error,
}

impl StateMachine for ContentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ContentStatus::*;
        matches!((self, target), (Generating, Generated) | (Generating, Error))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ContentStatus::*;
        match self {
            Generating => vec![Generated, Error],
            Generated | Error => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContentEntry {
    pub status: ContentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl GeneratedContentEntry {
    pub fn generating() -> Self {
        Self {
            status: ContentStatus::Generating,
            content: None,
        }
    }
}

/// Persisted cache of generated copy keyed by request fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContentStore {
    #[serde(default)]
    pub generated_content: BTreeMap<ContentFingerprint, GeneratedContentEntry>,
}

impl GeneratedContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ContentFingerprint) -> Option<&GeneratedContentEntry> {
        self.generated_content.get(key)
    }

    /// Opens a generation cycle for `key`.
    ///
    /// Returns false when a generation for the key is already running.
    /// A settled entry is replaced by a fresh `generating` one.
    pub fn start(&mut self, key: ContentFingerprint) -> bool {
        if matches!(self.get(&key), Some(entry) if entry.status == ContentStatus::Generating) {
            return false;
        }
        self.generated_content
            .insert(key, GeneratedContentEntry::generating());
        true
    }

    /// Settles a running entry with its copy.
    pub fn complete(
        &mut self,
        key: &ContentFingerprint,
        content: impl Into<String>,
    ) -> Result<(), ValidationError> {
        self.settle(key, ContentStatus::Generated, Some(content.into()))
    }

    /// Settles a running entry as failed. No content is kept.
    pub fn fail(&mut self, key: &ContentFingerprint) -> Result<(), ValidationError> {
        self.settle(key, ContentStatus::Error, None)
    }

    /// Records a terminal error for a key without running a generation.
    pub fn record_error(&mut self, key: ContentFingerprint) {
        self.generated_content.insert(
            key,
            GeneratedContentEntry {
                status: ContentStatus::Error,
                content: None,
            },
        );
    }

    pub fn remove(&mut self, key: &ContentFingerprint) -> Option<GeneratedContentEntry> {
        self.generated_content.remove(key)
    }

    pub fn len(&self) -> usize {
        self.generated_content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generated_content.is_empty()
    }

    fn settle(
        &mut self,
        key: &ContentFingerprint,
        status: ContentStatus,
        content: Option<String>,
    ) -> Result<(), ValidationError> {
        let entry = self
            .generated_content
            .get_mut(key)
            .ok_or_else(|| ValidationError::missing_field(key.to_string()))?;
        entry.status = entry.status.transition_to(status)?;
        entry.content = content;
        Ok(())
    }
}
