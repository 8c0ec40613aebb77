//! WidgetService - the backend operations wired to their ports.
//!
//! The service implements [`WidgetBackend`], so the HTTP routes and an
//! in-process conversation engine drive exactly the same code.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;

use super::content_generator::{ContentGenerator, GenerationError};
use super::extractor::{ExtractionError, StructuredExtractor};
use super::handlers::{
    ExtractIntentionCommand, ExtractIntentionHandler, ExtractProspectCommand,
    ExtractProspectHandler, ExtractSearchDataCommand, ExtractSearchDataHandler, StreamChatCommand,
    StreamChatError, StreamChatHandler,
};
use super::moderation_gate::ModerationGate;
use crate::domain::content::{ContentRequest, GenerationResult, MatchThreshold};
use crate::domain::conversation::{ChatMessage, WidgetProfile};
use crate::domain::moderation::ModerationVerdict;
use crate::domain::snapshot::Snapshot;
use crate::ports::{AIProvider, BackendError, Moderator, TextStream, TurnPayload, WidgetBackend};

/// All backend operations for one widget deployment.
pub struct WidgetService {
    stream_chat: StreamChatHandler,
    search_data: ExtractSearchDataHandler,
    intention: ExtractIntentionHandler,
    prospect: ExtractProspectHandler,
    moderation: ModerationGate,
    generator: ContentGenerator,
}

impl WidgetService {
    pub fn new(
        ai: Arc<dyn AIProvider>,
        moderator: Arc<dyn Moderator>,
        profile: WidgetProfile,
        threshold: MatchThreshold,
    ) -> Self {
        let extractor = Arc::new(StructuredExtractor::new(ai.clone()));
        Self {
            stream_chat: StreamChatHandler::new(ai.clone(), profile),
            search_data: ExtractSearchDataHandler::new(extractor.clone()),
            intention: ExtractIntentionHandler::new(extractor.clone()),
            prospect: ExtractProspectHandler::new(extractor),
            moderation: ModerationGate::new(moderator),
            generator: ContentGenerator::new(ai, threshold),
        }
    }
}

impl From<ExtractionError> for BackendError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::NoUserTurn => BackendError::Validation(err.to_string()),
            other => BackendError::Extraction(other.to_string()),
        }
    }
}

impl From<GenerationError> for BackendError {
    fn from(err: GenerationError) -> Self {
        if err.is_client_error() {
            BackendError::Validation(err.to_string())
        } else {
            BackendError::Generation(err.to_string())
        }
    }
}

impl From<StreamChatError> for BackendError {
    fn from(err: StreamChatError) -> Self {
        match err {
            StreamChatError::EmptyHistory => BackendError::Validation(err.to_string()),
            StreamChatError::Provider(e) => BackendError::Reply(e.to_string()),
        }
    }
}

#[async_trait]
impl WidgetBackend for WidgetService {
    async fn moderate(&self, content: &str) -> Result<ModerationVerdict, BackendError> {
        self.moderation
            .check(content)
            .await
            .map_err(|e| BackendError::Moderation(e.to_string()))
    }

    async fn stream_chat(&self, payload: TurnPayload) -> Result<TextStream, BackendError> {
        let stream = self
            .stream_chat
            .handle(StreamChatCommand {
                messages: payload.messages,
                search_config: payload.search_config,
                current_data: payload.current_data,
            })
            .await?;
        Ok(Box::pin(stream.map(|delta| delta.map_err(BackendError::from))))
    }

    async fn search_data(&self, payload: TurnPayload) -> Result<Snapshot, BackendError> {
        let snapshot = self
            .search_data
            .handle(ExtractSearchDataCommand {
                messages: payload.messages,
                search_config: payload.search_config,
                current_data: payload.current_data,
            })
            .await?;
        Ok(snapshot)
    }

    async fn customer_intention(
        &self,
        messages: Vec<ChatMessage>,
        current: Snapshot,
    ) -> Result<Snapshot, BackendError> {
        let snapshot = self
            .intention
            .handle(ExtractIntentionCommand {
                messages,
                current_data: current,
            })
            .await?;
        Ok(snapshot)
    }

    async fn customer_prospect(&self, messages: Vec<ChatMessage>) -> Result<Snapshot, BackendError> {
        let snapshot = self.prospect.handle(ExtractProspectCommand { messages }).await?;
        Ok(snapshot)
    }

    async fn generate_content(&self, request: ContentRequest) -> Result<GenerationResult, BackendError> {
        let result = self.generator.generate(&request).await?;
        Ok(result)
    }
}
