//! Application handlers.
//!
//! Command handlers for the per-turn backend operations. Each handler is
//! stateless; the caller sends the full snapshot and gets the next one back.

pub mod extract_intention;
pub mod extract_prospect;
pub mod extract_search_data;
pub mod stream_chat;

pub use extract_intention::{ExtractIntentionCommand, ExtractIntentionHandler};
pub use extract_prospect::{ExtractProspectCommand, ExtractProspectHandler};
pub use extract_search_data::{ExtractSearchDataCommand, ExtractSearchDataHandler};
pub use stream_chat::{ReplyStream, StreamChatCommand, StreamChatError, StreamChatHandler};
