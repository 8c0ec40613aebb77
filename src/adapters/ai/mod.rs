//! AI Provider Adapters.
//!
//! ## Available Adapters
//!
//! - `OpenAIProvider` - OpenAI chat completions with structured output and SSE streaming
//! - `OpenAIModerator` - OpenAI moderation endpoint
//! - `MockAIProvider` / `MockModerator` - Configurable doubles for testing

mod mock_moderator;
mod mock_provider;
mod openai_moderator;
mod openai_provider;

pub use mock_moderator::MockModerator;
pub use mock_provider::{MockAIProvider, MockError, MockResponse, DEFAULT_MOCK_CONTENT};
pub use openai_moderator::{OpenAIModerator, DEFAULT_MODERATION_MODEL};
pub use openai_provider::{OpenAIConfig, OpenAIProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
