//! Content generation with an optional strong-match gate.
//!
//! With `strongMatchOnly` the scorer runs to completion first and a weak
//! match ends the request without any generation call. Copy that fails
//! verification is rejected, never trimmed to fit.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use super::match_scorer::{MatchScoreError, MatchScorer};
use crate::domain::content::{
    generation_output_schema, generation_system_prompt, generation_user_prompt, ContentRequest,
    GeneratedCopy, GenerationResult, MatchMetadata, MatchThreshold, PERSONALIZED_CONTENT_FORMAT,
};
use crate::domain::conversation::Role;
use crate::domain::foundation::ValidationError;
use crate::domain::sanitize::{ModelOutputError, ResponseSanitizer};
use crate::ports::{AIError, AIProvider, CompletionRequest, RequestMetadata, ResponseFormat};

/// Errors that can occur while generating content.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid content request: {0}")]
    InvalidRequest(ValidationError),

    #[error("match check failed: {0}")]
    MatchCheck(#[from] MatchScoreError),

    #[error("AI provider error: {0}")]
    Provider(#[from] AIError),

    #[error("generated content unreadable: {0}")]
    InvalidOutput(String),

    #[error("generated content rejected: {0}")]
    Rejected(ValidationError),
}

impl GenerationError {
    /// True when the caller sent a bad request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GenerationError::InvalidRequest(_))
    }
}

impl From<ModelOutputError> for GenerationError {
    fn from(err: ModelOutputError) -> Self {
        GenerationError::InvalidOutput(err.to_string())
    }
}

/// Writes personalized copy for one item.
pub struct ContentGenerator {
    ai: Arc<dyn AIProvider>,
    scorer: MatchScorer,
    threshold: MatchThreshold,
    sanitizer: ResponseSanitizer,
}

impl ContentGenerator {
    pub fn new(ai: Arc<dyn AIProvider>, threshold: MatchThreshold) -> Self {
        Self {
            scorer: MatchScorer::new(ai.clone()),
            ai,
            threshold,
            sanitizer: ResponseSanitizer::new(),
        }
    }

    pub fn threshold(&self) -> MatchThreshold {
        self.threshold
    }

    #[tracing::instrument(skip_all, fields(name = %request.name, strong_match_only = request.strong_match_only))]
    pub async fn generate(&self, request: &ContentRequest) -> Result<GenerationResult, GenerationError> {
        request.validate().map_err(GenerationError::InvalidRequest)?;

        let matching = if request.strong_match_only {
            let analysis = self.scorer.score(request).await?;
            let matching = MatchMetadata {
                match_score: analysis.score,
                match_score_threshold: self.threshold,
            };
            if !analysis.score.is_strong(self.threshold) {
                tracing::info!(
                    score = analysis.score.value(),
                    threshold = self.threshold.value(),
                    "weak match, skipping generation"
                );
                return Ok(GenerationResult::weak_match(request, matching));
            }
            Some(matching)
        } else {
            None
        };

        let copy = self.write_copy(request).await?;
        copy.verify(request).map_err(|e| {
            tracing::warn!(error = %e, "generated content rejected");
            GenerationError::Rejected(e)
        })?;

        let result = copy.into_result(request, matching);
        tracing::info!(scenario = result.scenario(), "content generated");
        Ok(result)
    }

    async fn write_copy(&self, request: &ContentRequest) -> Result<GeneratedCopy, GenerationError> {
        let completion = CompletionRequest::new(RequestMetadata::new(Uuid::new_v4().to_string()))
            .with_system_prompt(generation_system_prompt(request))
            .with_message(Role::User, generation_user_prompt(request))
            .with_response_format(ResponseFormat::strict(
                PERSONALIZED_CONTENT_FORMAT,
                generation_output_schema(request),
            ));

        let response = self.ai.complete(completion).await?;
        let value = self.sanitizer.parse_json(&response.content)?;
        serde_json::from_value(value).map_err(|e| GenerationError::InvalidOutput(e.to_string()))
    }
}
