//! ExtractProspectHandler - summarises what the customer is looking for.

use std::sync::Arc;

use crate::application::extractor::{
    ExtractionError, ExtractionRequest, StructuredExtractor, PROSPECT_FORMAT,
};
use crate::domain::conversation::{prospect_prompt, ChatMessage};
use crate::domain::foundation::Timestamp;
use crate::domain::schema::prospect_schema;
use crate::domain::snapshot::Snapshot;

/// Command to extract the customer prospect from the whole conversation.
#[derive(Debug, Clone)]
pub struct ExtractProspectCommand {
    pub messages: Vec<ChatMessage>,
}

/// Handler for customer prospect extraction. There is no prior snapshot.
pub struct ExtractProspectHandler {
    extractor: Arc<StructuredExtractor>,
}

impl ExtractProspectHandler {
    pub fn new(extractor: Arc<StructuredExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn handle(&self, cmd: ExtractProspectCommand) -> Result<Snapshot, ExtractionError> {
        self.extractor
            .extract(ExtractionRequest {
                history: &cmd.messages,
                schema: prospect_schema(),
                system_prompt: prospect_prompt(Timestamp::now()),
                format: PROSPECT_FORMAT,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use serde_json::json;

    #[tokio::test]
    async fn returns_validated_prospect() {
        let ai = Arc::new(MockAIProvider::new().with_response_for(
            PROSPECT_FORMAT,
            json!({
                "type": "road bike",
                "priceRange": { "min": 800, "max": 1500 },
                "specifications": ["carbon frame"],
                "preferences": null
            })
            .to_string(),
        ));
        let handler = ExtractProspectHandler::new(Arc::new(StructuredExtractor::new(ai.clone())));

        let prospect = handler
            .handle(ExtractProspectCommand {
                messages: vec![ChatMessage::user("A carbon road bike, 800 to 1500 euros")],
            })
            .await
            .unwrap();

        assert_eq!(prospect.get("type"), Some(&json!("road bike")));
        assert_eq!(prospect.get("priceRange"), Some(&json!({ "min": 800, "max": 1500 })));
        assert_eq!(ai.call_count_for(PROSPECT_FORMAT), 1);
    }

    #[tokio::test]
    async fn wrong_price_range_shape_is_rejected() {
        let ai = Arc::new(MockAIProvider::new().with_response_for(
            PROSPECT_FORMAT,
            json!({
                "type": null,
                "priceRange": "cheap",
                "specifications": null,
                "preferences": null
            })
            .to_string(),
        ));
        let handler = ExtractProspectHandler::new(Arc::new(StructuredExtractor::new(ai)));

        let result = handler
            .handle(ExtractProspectCommand {
                messages: vec![ChatMessage::user("Something cheap")],
            })
            .await;

        assert!(matches!(result, Err(ExtractionError::Schema(_))));
    }
}
