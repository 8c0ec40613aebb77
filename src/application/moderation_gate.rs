//! Moderation gate - one message in, one verdict out.

use std::sync::Arc;

use crate::domain::moderation::ModerationVerdict;
use crate::domain::sanitize::sanitize_user_text;
use crate::ports::{ModerationError, Moderator};

/// Classifies a single message. No history is consulted.
pub struct ModerationGate {
    moderator: Arc<dyn Moderator>,
}

impl ModerationGate {
    pub fn new(moderator: Arc<dyn Moderator>) -> Self {
        Self { moderator }
    }

    /// Sanitizes `text` and asks the moderator about it.
    ///
    /// Text that is empty after sanitizing is safe without a call.
    pub async fn check(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        let clean = sanitize_user_text(text);
        if clean.is_empty() {
            return Ok(ModerationVerdict::safe());
        }

        let verdict = self.moderator.moderate(&clean).await?;
        if verdict.flagged {
            tracing::info!(categories = ?verdict.categories, "message flagged");
        }
        Ok(verdict)
    }
}
