//! ExtractIntentionHandler - extracts the customer intention and merges it
//! with contradiction removal across likes, dislikes and priorities.

use std::sync::Arc;

use crate::application::extractor::{
    ExtractionError, ExtractionRequest, StructuredExtractor, INTENTION_FORMAT,
};
use crate::domain::conversation::{intention_prompt, ChatMessage};
use crate::domain::foundation::Timestamp;
use crate::domain::schema::intention_extraction_schema;
use crate::domain::snapshot::{merge_with, MergePolicy, Snapshot};

/// Command to refresh the customer intention snapshot.
#[derive(Debug, Clone)]
pub struct ExtractIntentionCommand {
    pub messages: Vec<ChatMessage>,
    pub current_data: Snapshot,
}

/// Handler for customer intention extraction.
pub struct ExtractIntentionHandler {
    extractor: Arc<StructuredExtractor>,
}

impl ExtractIntentionHandler {
    pub fn new(extractor: Arc<StructuredExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn handle(&self, cmd: ExtractIntentionCommand) -> Result<Snapshot, ExtractionError> {
        let schema = intention_extraction_schema();
        let candidate = self
            .extractor
            .extract(ExtractionRequest {
                history: &cmd.messages,
                schema,
                system_prompt: intention_prompt(&cmd.current_data, Timestamp::now()),
                format: INTENTION_FORMAT,
            })
            .await?;

        Ok(merge_with(&cmd.current_data, &candidate, schema, MergePolicy::intention()))
    }
}
