//! Business-facing description of a widget deployment.

use serde::{Deserialize, Serialize};

use crate::domain::schema::SearchSchema;

/// Context the chat assistant is given about the business it serves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetProfile {
    #[serde(default)]
    pub business_context: String,
    #[serde(default)]
    pub user_context: String,
    #[serde(default)]
    pub instructions: String,
}

/// Search data a deployment collects, in its wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    #[serde(default)]
    pub search_data: SearchSchema,
}

impl SearchConfig {
    pub fn new(search_data: SearchSchema) -> Self {
        Self { search_data }
    }
}
