//! OpenAI Moderator - Implementation of the Moderator port on the
//! `/moderations` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::openai_provider::{check_status, send_error, OpenAIConfig};
use crate::domain::moderation::ModerationVerdict;
use crate::ports::{AIError, ModerationError, Moderator};

/// Default moderation model.
pub const DEFAULT_MODERATION_MODEL: &str = "omni-moderation-latest";

pub struct OpenAIModerator {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIModerator {
    /// Builds a moderator. `config.model` names the moderation model.
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn moderations_url(&self) -> String {
        format!("{}/moderations", self.config.base_url)
    }
}

#[async_trait]
impl Moderator for OpenAIModerator {
    #[tracing::instrument(skip_all, fields(model = %self.config.model))]
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        let body = ModerationRequest {
            model: &self.config.model,
            input: text,
        };

        let response = self
            .client
            .post(self.moderations_url())
            .bearer_auth(self.config.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, self.config.timeout))
            .map_err(moderation_error)?;
        let response = check_status(response).await.map_err(moderation_error)?;

        let parsed: ModerationResponse = response
            .json()
            .await
            .map_err(|e| ModerationError::Parse(e.to_string()))?;

        parse_verdict(parsed)
    }
}

fn moderation_error(err: AIError) -> ModerationError {
    match err {
        AIError::AuthenticationFailed => ModerationError::AuthenticationFailed,
        other => ModerationError::Unavailable(other.to_string()),
    }
}

fn parse_verdict(response: ModerationResponse) -> Result<ModerationVerdict, ModerationError> {
    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ModerationError::Parse("no moderation results".to_string()))?;
    Ok(ModerationVerdict::from_provider(result.flagged, result.categories))
}

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: Map<String, Value>,
}
