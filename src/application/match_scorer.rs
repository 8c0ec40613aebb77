//! Match scoring - item-to-intention compatibility.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::content::{
    match_output_schema, match_user_prompt, ContentRequest, MatchScore, MATCH_ANALYSIS_FORMAT,
    MATCH_SYSTEM_PROMPT,
};
use crate::domain::conversation::Role;
use crate::domain::foundation::ValidationError;
use crate::domain::sanitize::{ModelOutputError, ResponseSanitizer};
use crate::ports::{AIError, AIProvider, CompletionRequest, RequestMetadata, ResponseFormat};

/// Score and the model's short reasoning.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchAnalysis {
    pub score: MatchScore,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    score: f64,
    #[serde(default)]
    explanation: String,
}

/// A failed match check. Never to be read as "no match".
#[derive(Debug, Error)]
pub enum MatchScoreError {
    #[error("AI provider error: {0}")]
    Provider(#[from] AIError),

    #[error("match analysis unreadable: {0}")]
    InvalidOutput(String),

    #[error("match score invalid: {0}")]
    OutOfRange(#[from] ValidationError),
}

impl From<ModelOutputError> for MatchScoreError {
    fn from(err: ModelOutputError) -> Self {
        MatchScoreError::InvalidOutput(err.to_string())
    }
}

/// Scores an item against a customer intention with pinned sampling.
pub struct MatchScorer {
    ai: Arc<dyn AIProvider>,
    sanitizer: ResponseSanitizer,
}

impl MatchScorer {
    pub fn new(ai: Arc<dyn AIProvider>) -> Self {
        Self {
            ai,
            sanitizer: ResponseSanitizer::new(),
        }
    }

    #[tracing::instrument(skip_all, fields(name = %request.name))]
    pub async fn score(&self, request: &ContentRequest) -> Result<MatchAnalysis, MatchScoreError> {
        let completion = CompletionRequest::new(RequestMetadata::new(Uuid::new_v4().to_string()))
            .with_system_prompt(MATCH_SYSTEM_PROMPT)
            .with_message(Role::User, match_user_prompt(request))
            .with_temperature(0.0)
            .with_response_format(ResponseFormat::strict(
                MATCH_ANALYSIS_FORMAT,
                match_output_schema(),
            ));

        let response = self.ai.complete(completion).await?;
        let value = self.sanitizer.parse_json(&response.content)?;
        let raw: RawAnalysis =
            serde_json::from_value(value).map_err(|e| MatchScoreError::InvalidOutput(e.to_string()))?;
        let score = MatchScore::new(raw.score)?;

        tracing::info!(score = score.value(), "match scored");
        Ok(MatchAnalysis {
            score,
            explanation: raw.explanation,
        })
    }
}
