//! Channel-backed search trigger.
//!
//! The host application owns the receiving end and runs the actual search
//! (a catalogue query, a redirect, a webhook). The trigger only delivers the
//! completed snapshot.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::foundation::SessionId;
use crate::domain::snapshot::Snapshot;
use crate::ports::{SearchTrigger, SearchTriggerError};

/// A completed search handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub session_id: SessionId,
    pub search_data: Snapshot,
}

#[derive(Debug, Clone)]
pub struct ChannelSearchTrigger {
    sender: mpsc::Sender<SearchRequest>,
}

impl ChannelSearchTrigger {
    /// Creates a trigger and the receiver the consumer reads from.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<SearchRequest>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl SearchTrigger for ChannelSearchTrigger {
    async fn trigger(&self, session_id: SessionId, snapshot: &Snapshot) -> Result<(), SearchTriggerError> {
        tracing::info!(session_id = %session_id, "search triggered");
        self.sender
            .send(SearchRequest {
                session_id,
                search_data: snapshot.clone(),
            })
            .await
            .map_err(|_| SearchTriggerError::Closed)
    }
}
