//! Conversation module - chat history, turn state and prompts.

mod history;
mod message;
mod profile;
mod prompts;
mod session;
mod state;

pub use history::{ConversationHistory, InFlightReply};
pub use message::{ChatMessage, Role};
pub use profile::{SearchConfig, WidgetProfile};
pub use prompts::{chat_system_prompt, intention_prompt, prospect_prompt, search_data_prompt};
pub use session::{ChatState, CHAT_STORAGE_KEY};
pub use state::{ExtractionPhase, TurnPhase};

/// Reply shown when streaming the assistant reply fails.
pub const REPLY_FAILURE_TEXT: &str = "Sorry, something went wrong.";

/// Reply shown instead of a model answer when moderation flags a message.
pub const REFUSAL_TEXT: &str =
    "Sorry, I can't help with that. Is there something else I can help you find?";
