//! Widget Backend Port - the backend surface as the conversation engine
//! sees it.
//!
//! The engine runs identically against the remote HTTP backend and against
//! in-process services.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::domain::content::{ContentRequest, GenerationResult};
use crate::domain::conversation::{ChatMessage, SearchConfig};
use crate::domain::moderation::ModerationVerdict;
use crate::domain::snapshot::Snapshot;

/// Streamed reply text, chunk by chunk.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send>>;

#[async_trait]
pub trait WidgetBackend: Send + Sync {
    async fn moderate(&self, content: &str) -> Result<ModerationVerdict, BackendError>;

    /// Opens the assistant reply stream for a turn.
    async fn stream_chat(&self, payload: TurnPayload) -> Result<TextStream, BackendError>;

    /// Extracts and merges search data; returns the merged snapshot.
    async fn search_data(&self, payload: TurnPayload) -> Result<Snapshot, BackendError>;

    /// Extracts and merges customer intention; returns the merged snapshot.
    async fn customer_intention(
        &self,
        messages: Vec<ChatMessage>,
        current: Snapshot,
    ) -> Result<Snapshot, BackendError>;

    async fn customer_prospect(&self, messages: Vec<ChatMessage>) -> Result<Snapshot, BackendError>;

    async fn generate_content(&self, request: ContentRequest) -> Result<GenerationResult, BackendError>;
}

/// Body shared by the chat and search data calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPayload {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub search_config: SearchConfig,
    #[serde(default)]
    pub current_data: Snapshot,
}

/// Failures reported by a backend call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The request was rejected as malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("moderation failed: {0}")]
    Moderation(String),

    #[error("reply failed: {0}")]
    Reply(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("generation failed: {0}")]
    Generation(String),

    /// The call never produced a response (connection, timeout, status).
    #[error("transport error: {0}")]
    Transport(String),
}
