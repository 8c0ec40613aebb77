//! Moderation verdicts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Safety classification of a single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub flagged: bool,
    /// Category flags, present only on flagged messages.
    pub categories: Option<Map<String, Value>>,
}

impl ModerationVerdict {
    pub fn safe() -> Self {
        Self {
            flagged: false,
            categories: None,
        }
    }

    pub fn flagged(categories: Map<String, Value>) -> Self {
        Self {
            flagged: true,
            categories: Some(categories),
        }
    }

    /// Builds a verdict from a provider result, dropping categories on safe text.
    pub fn from_provider(flagged: bool, categories: Map<String, Value>) -> Self {
        if flagged {
            Self::flagged(categories)
        } else {
            Self::safe()
        }
    }
}
