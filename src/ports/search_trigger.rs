//! Search Trigger Port - the downstream effect fired once required search
//! fields are all present.

use async_trait::async_trait;

use crate::domain::foundation::SessionId;
use crate::domain::snapshot::Snapshot;

#[async_trait]
pub trait SearchTrigger: Send + Sync {
    /// Runs the search for a completed snapshot.
    async fn trigger(&self, session_id: SessionId, snapshot: &Snapshot) -> Result<(), SearchTriggerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SearchTriggerError {
    #[error("search trigger failed: {0}")]
    Failed(String),

    #[error("search receiver closed")]
    Closed,
}
