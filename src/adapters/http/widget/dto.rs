//! HTTP DTOs for the widget endpoints.
//!
//! Bodies are camelCase to match what the embedded widget sends. The chat
//! and search data calls share [`TurnPayload`](crate::ports::TurnPayload).

use serde::{Deserialize, Serialize};

use crate::domain::conversation::ChatMessage;
use crate::domain::snapshot::Snapshot;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /customer-intention`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub current_data: Snapshot,
}

/// Body of `POST /customer-prospect`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProspectRequest {
    pub messages: Vec<ChatMessage>,
}

/// Body of `POST /moderate-user-message`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerateRequest {
    pub content: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
