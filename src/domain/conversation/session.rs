//! Persisted per-session chat state.

use serde::{Deserialize, Serialize};

use super::history::ConversationHistory;
use super::profile::SearchConfig;
use crate::domain::snapshot::Snapshot;

/// Storage key of the conversation state.
pub const CHAT_STORAGE_KEY: &str = "chat-storage";

/// Everything a session keeps between page loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    #[serde(default)]
    pub search_data: Snapshot,
    #[serde(default)]
    pub customer_intention: Snapshot,
    #[serde(default)]
    pub messages: ConversationHistory,
    /// Set when a merge changed the search snapshot since the last search.
    #[serde(default)]
    pub is_search_data_updated: bool,
    #[serde(default)]
    pub search_config: SearchConfig,
    /// When true, a satisfied search waits for the user to confirm.
    #[serde(default)]
    pub require_manual_search: bool,
}

impl ChatState {
    pub fn new(search_config: SearchConfig, require_manual_search: bool) -> Self {
        Self {
            search_config,
            require_manual_search,
            ..Self::default()
        }
    }
}
