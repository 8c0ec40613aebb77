//! Structured extraction - turns a conversation into a schema-shaped snapshot.
//!
//! The extractor sends the whole history (never just the latest turn) with a
//! strict structured-output format and validates what comes back. It never
//! merges; callers fold the candidate into their prior snapshot and treat
//! any [`ExtractionError`] as a no-op turn.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::conversation::{ChatMessage, Role};
use crate::domain::sanitize::{ModelOutputError, ResponseSanitizer};
use crate::domain::schema::{validate, SchemaDescriptor, SchemaValidationError};
use crate::domain::snapshot::Snapshot;
use crate::ports::{AIError, AIProvider, CompletionRequest, RequestMetadata, ResponseFormat};

/// Structured output name for search data.
pub const SEARCH_DATA_FORMAT: &str = "searchData";

/// Structured output name for the customer intention.
pub const INTENTION_FORMAT: &str = "customerIntention";

/// Structured output name for the customer prospect.
pub const PROSPECT_FORMAT: &str = "customerProspect";

/// One extraction call.
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    pub history: &'a [ChatMessage],
    pub schema: &'a SchemaDescriptor,
    /// Carries the prior snapshot and the reference date.
    pub system_prompt: String,
    pub format: &'static str,
}

/// Errors that can occur during extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("history contains no user message")]
    NoUserTurn,

    #[error("AI provider error: {0}")]
    Provider(#[from] AIError),

    #[error("model output unreadable: {0}")]
    InvalidOutput(#[from] ModelOutputError),

    #[error("model output does not match schema: {0}")]
    Schema(#[from] SchemaValidationError),
}

/// Runs schema-constrained extraction against an [`AIProvider`].
pub struct StructuredExtractor {
    ai: Arc<dyn AIProvider>,
    sanitizer: ResponseSanitizer,
}

impl StructuredExtractor {
    pub fn new(ai: Arc<dyn AIProvider>) -> Self {
        Self {
            ai,
            sanitizer: ResponseSanitizer::new(),
        }
    }

    /// Returns the validated candidate snapshot.
    ///
    /// Every declared key is present in the candidate; `null` marks a field
    /// the model left unset.
    #[tracing::instrument(skip_all, fields(format = request.format, turns = request.history.len()))]
    pub async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Snapshot, ExtractionError> {
        if !request.history.iter().any(ChatMessage::is_user) {
            return Err(ExtractionError::NoUserTurn);
        }

        let completion = CompletionRequest::new(RequestMetadata::new(Uuid::new_v4().to_string()))
            .with_system_prompt(request.system_prompt)
            .with_messages(
                request
                    .history
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .cloned(),
            )
            .with_response_format(ResponseFormat::strict(
                request.format,
                request.schema.to_json_schema(),
            ));

        let response = self.ai.complete(completion).await?;
        let value = self.sanitizer.parse_json(&response.content)?;
        let candidate = validate(&value, request.schema)?;

        tracing::debug!(fields = candidate.len(), "extraction candidate validated");
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::domain::schema::SchemaField;
    use serde_json::json;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new()
            .with_field("location", SchemaField::string("City").required())
            .with_field("tags", SchemaField::string_array("Tags"))
    }

    fn history() -> Vec<ChatMessage> {
        vec![
            ChatMessage::assistant("Where would you like to go? What about Bali?"),
            ChatMessage::user("Yes, that sounds good"),
        ]
    }

    fn request<'a>(history: &'a [ChatMessage], schema: &'a SchemaDescriptor) -> ExtractionRequest<'a> {
        ExtractionRequest {
            history,
            schema,
            system_prompt: "extract".to_string(),
            format: SEARCH_DATA_FORMAT,
        }
    }

    mod success {
        use super::*;

        #[tokio::test]
        async fn returns_validated_candidate() {
            let ai = Arc::new(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, r#"{"location":"Bali","tags":null}"#),
            );
            let extractor = StructuredExtractor::new(ai);
            let (history, schema) = (history(), schema());

            let candidate = extractor.extract(request(&history, &schema)).await.unwrap();

            assert_eq!(candidate.get("location"), Some(&json!("Bali")));
            assert_eq!(candidate.get("tags"), Some(&json!(null)));
        }

        #[tokio::test]
        async fn sends_whole_history_with_strict_format() {
            let ai = Arc::new(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, r#"{"location":null,"tags":null}"#),
            );
            let extractor = StructuredExtractor::new(ai.clone());
            let (history, schema) = (history(), schema());

            extractor.extract(request(&history, &schema)).await.unwrap();

            let calls = ai.get_calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].messages, history);
            assert_eq!(calls[0].system_prompt.as_deref(), Some("extract"));
            let format = calls[0].response_format.as_ref().unwrap();
            assert_eq!(format.name, SEARCH_DATA_FORMAT);
            assert!(format.strict);
            assert_eq!(format.schema["additionalProperties"], json!(false));
        }

        #[tokio::test]
        async fn accepts_fenced_json() {
            let ai = Arc::new(MockAIProvider::new().with_response_for(
                SEARCH_DATA_FORMAT,
                "```json\n{\"location\":\"Paris\",\"tags\":[\"food\"]}\n```",
            ));
            let extractor = StructuredExtractor::new(ai);
            let (history, schema) = (history(), schema());

            let candidate = extractor.extract(request(&history, &schema)).await.unwrap();
            assert_eq!(candidate.get("tags"), Some(&json!(["food"])));
        }

        #[tokio::test]
        async fn drops_system_messages_from_history() {
            let ai = Arc::new(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, r#"{"location":null,"tags":null}"#),
            );
            let extractor = StructuredExtractor::new(ai.clone());
            let mut history = history();
            history.insert(0, ChatMessage::system("hidden"));
            let schema = schema();

            extractor.extract(request(&history, &schema)).await.unwrap();

            assert!(ai.get_calls()[0].messages.iter().all(|m| m.role != Role::System));
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn rejects_history_without_user_turn() {
            let ai = Arc::new(MockAIProvider::new());
            let extractor = StructuredExtractor::new(ai.clone());
            let history = vec![ChatMessage::assistant("Hello!")];
            let schema = schema();

            let err = extractor.extract(request(&history, &schema)).await.unwrap_err();

            assert!(matches!(err, ExtractionError::NoUserTurn));
            assert_eq!(ai.call_count(), 0);
        }

        #[tokio::test]
        async fn provider_error_is_reported() {
            let ai = Arc::new(MockAIProvider::new().with_error_for(
                SEARCH_DATA_FORMAT,
                MockError::Unavailable {
                    message: "down".to_string(),
                },
            ));
            let extractor = StructuredExtractor::new(ai);
            let (history, schema) = (history(), schema());

            let err = extractor.extract(request(&history, &schema)).await.unwrap_err();
            assert!(matches!(err, ExtractionError::Provider(_)));
        }

        #[tokio::test]
        async fn unparsable_output_is_reported() {
            let ai = Arc::new(MockAIProvider::new().with_response_for(SEARCH_DATA_FORMAT, "not json"));
            let extractor = StructuredExtractor::new(ai);
            let (history, schema) = (history(), schema());

            let err = extractor.extract(request(&history, &schema)).await.unwrap_err();
            assert!(matches!(err, ExtractionError::InvalidOutput(_)));
        }

        #[tokio::test]
        async fn extra_keys_fail_validation() {
            let ai = Arc::new(MockAIProvider::new().with_response_for(
                SEARCH_DATA_FORMAT,
                r#"{"location":"Paris","tags":null,"mood":"happy"}"#,
            ));
            let extractor = StructuredExtractor::new(ai);
            let (history, schema) = (history(), schema());

            let err = extractor.extract(request(&history, &schema)).await.unwrap_err();
            assert!(matches!(err, ExtractionError::Schema(_)));
        }

        #[tokio::test]
        async fn missing_keys_fail_validation() {
            let ai = Arc::new(
                MockAIProvider::new().with_response_for(SEARCH_DATA_FORMAT, r#"{"location":"Paris"}"#),
            );
            let extractor = StructuredExtractor::new(ai);
            let (history, schema) = (history(), schema());

            let err = extractor.extract(request(&history, &schema)).await.unwrap_err();
            assert!(matches!(err, ExtractionError::Schema(_)));
        }
    }
}
