//! ExtractSearchDataHandler - extracts search data and merges it into the
//! caller's snapshot.

use std::sync::Arc;

use crate::application::extractor::{
    ExtractionError, ExtractionRequest, StructuredExtractor, SEARCH_DATA_FORMAT,
};
use crate::domain::conversation::{search_data_prompt, ChatMessage, SearchConfig};
use crate::domain::foundation::Timestamp;
use crate::domain::snapshot::{merge, Snapshot};

/// Command to refresh the search data snapshot.
#[derive(Debug, Clone)]
pub struct ExtractSearchDataCommand {
    pub messages: Vec<ChatMessage>,
    pub search_config: SearchConfig,
    pub current_data: Snapshot,
}

/// Handler for search data extraction.
pub struct ExtractSearchDataHandler {
    extractor: Arc<StructuredExtractor>,
}

impl ExtractSearchDataHandler {
    pub fn new(extractor: Arc<StructuredExtractor>) -> Self {
        Self { extractor }
    }

    /// Returns the merged snapshot. On error the caller keeps its prior one.
    pub async fn handle(&self, cmd: ExtractSearchDataCommand) -> Result<Snapshot, ExtractionError> {
        let schema = &cmd.search_config.search_data;
        let candidate = self
            .extractor
            .extract(ExtractionRequest {
                history: &cmd.messages,
                schema,
                system_prompt: search_data_prompt(schema, &cmd.current_data, Timestamp::now()),
                format: SEARCH_DATA_FORMAT,
            })
            .await?;

        Ok(merge(&cmd.current_data, &candidate, schema))
    }
}
