//! StreamChatHandler - streams the assistant's reply for one turn.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::conversation::{chat_system_prompt, ChatMessage, Role, SearchConfig, WidgetProfile};
use crate::domain::foundation::Timestamp;
use crate::domain::snapshot::Snapshot;
use crate::ports::{AIError, AIProvider, CompletionRequest, RequestMetadata};

/// Text deltas of one reply, in arrival order.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, StreamChatError>> + Send>>;

/// Command to stream a reply to the conversation so far.
#[derive(Debug, Clone)]
pub struct StreamChatCommand {
    pub messages: Vec<ChatMessage>,
    pub search_config: SearchConfig,
    pub current_data: Snapshot,
}

/// Errors that can occur while streaming a reply.
#[derive(Debug, Error)]
pub enum StreamChatError {
    #[error("messages cannot be empty")]
    EmptyHistory,

    #[error("AI provider error: {0}")]
    Provider(#[from] AIError),
}

/// Handler for streamed chat replies.
pub struct StreamChatHandler {
    ai: Arc<dyn AIProvider>,
    profile: WidgetProfile,
}

impl StreamChatHandler {
    pub fn new(ai: Arc<dyn AIProvider>, profile: WidgetProfile) -> Self {
        Self { ai, profile }
    }

    pub async fn handle(&self, cmd: StreamChatCommand) -> Result<ReplyStream, StreamChatError> {
        if cmd.messages.is_empty() {
            return Err(StreamChatError::EmptyHistory);
        }

        let prompt = chat_system_prompt(
            &self.profile,
            &cmd.search_config.search_data,
            &cmd.current_data,
            Timestamp::now(),
        );
        let request = CompletionRequest::new(RequestMetadata::new(Uuid::new_v4().to_string()))
            .with_system_prompt(prompt)
            .with_messages(cmd.messages.into_iter().filter(|m| m.role != Role::System));

        let chunks = self.ai.stream_complete(request).await?;

        let deltas = chunks.filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) if chunk.delta.is_empty() => None,
                Ok(chunk) => Some(Ok(chunk.delta)),
                Err(e) => Some(Err(StreamChatError::Provider(e))),
            }
        });
        Ok(Box::pin(deltas))
    }
}
