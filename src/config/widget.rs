//! Widget deployment configuration
//!
//! The business-facing part of a deployment (contexts, instructions and the
//! search schema) lives in a YAML or JSON file; thresholds and switches come
//! from the environment like everything else.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ValidationError};
use crate::domain::content::{MatchThreshold, DEFAULT_MATCH_THRESHOLD};
use crate::domain::conversation::{SearchConfig, WidgetProfile};
use crate::domain::schema::SearchSchema;

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    /// Path to the widget definition file
    pub config_path: Option<PathBuf>,

    /// Minimum match score for strong-match-only generation
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Wait for an explicit confirmation before triggering search
    #[serde(default)]
    pub require_manual_search: bool,
}

/// Contents of the widget definition file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDefinition {
    #[serde(flatten)]
    pub profile: WidgetProfile,

    #[serde(default)]
    pub search_data: SearchSchema,
}

impl WidgetDefinition {
    /// Reads a definition. JSON files parse as YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let definition_error = |message: String| ConfigError::WidgetDefinition {
            path: path.display().to_string(),
            message,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| definition_error(e.to_string()))?;
        serde_yaml::from_str(&raw).map_err(|e| definition_error(e.to_string()))
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::new(self.search_data.clone())
    }
}

impl WidgetConfig {
    /// Loads the definition file, or an empty definition when none is configured.
    pub fn load_definition(&self) -> Result<WidgetDefinition, ConfigError> {
        match &self.config_path {
            Some(path) => WidgetDefinition::from_file(path),
            None => Ok(WidgetDefinition::default()),
        }
    }

    pub fn threshold(&self) -> Result<MatchThreshold, ValidationError> {
        MatchThreshold::new(self.match_threshold)
            .map_err(|_| ValidationError::InvalidMatchThreshold(self.match_threshold))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.threshold().map(|_| ())
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            match_threshold: default_match_threshold(),
            require_manual_search: false,
        }
    }
}

fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}
