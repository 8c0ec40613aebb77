//! AI provider configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::ai::{OpenAIConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_MODERATION_MODEL};

/// OpenAI configuration for chat, extraction, generation and moderation
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// OpenAI API key
    pub openai_api_key: Option<Secret<String>>,

    /// Chat completion model
    #[serde(default = "default_model")]
    pub model: String,

    /// Moderation model
    #[serde(default = "default_moderation_model")]
    pub moderation_model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum transport retries on 429/5xx
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if OpenAI is configured
    pub fn has_openai(&self) -> bool {
        self.openai_api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Adapter settings for completions, if a key is configured.
    pub fn completion_config(&self) -> Option<OpenAIConfig> {
        self.adapter_config(&self.model)
    }

    /// Adapter settings for moderation, if a key is configured.
    pub fn moderation_config(&self) -> Option<OpenAIConfig> {
        self.adapter_config(&self.moderation_model)
    }

    fn adapter_config(&self, model: &str) -> Option<OpenAIConfig> {
        let key = self.openai_api_key.as_ref().filter(|_| self.has_openai())?;
        Some(
            OpenAIConfig::new(key.expose_secret().clone())
                .with_model(model)
                .with_base_url(self.base_url.as_str())
                .with_timeout(self.timeout())
                .with_max_retries(self.max_retries),
        )
    }

    /// Validate AI configuration. The key is optional only when `key_required` is false.
    pub fn validate(&self, key_required: bool) -> Result<(), ValidationError> {
        if key_required && !self.has_openai() {
            return Err(ValidationError::MissingRequired("OPENAI_API_KEY"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: default_model(),
            moderation_model: default_moderation_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_moderation_model() -> String {
    DEFAULT_MODERATION_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}
