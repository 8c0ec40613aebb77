//! Moderator Port - single-message safety classification.

use async_trait::async_trait;

use crate::domain::moderation::ModerationVerdict;

/// Classifies one message as safe or unsafe. Stateless; sees no history.
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ModerationError>;
}

/// The moderation call itself failed; no verdict exists.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("moderation unavailable: {0}")]
    Unavailable(String),

    #[error("moderation response malformed: {0}")]
    Parse(String),

    #[error("moderation authentication failed")]
    AuthenticationFailed,
}
