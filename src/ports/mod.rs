//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Model Ports
//!
//! - `AIProvider` - Text completion, streaming and structured output
//! - `Moderator` - Single-message safety classification
//!
//! ## Session Ports
//!
//! - `SessionStore` - Durable per-session key-value documents
//! - `SearchTrigger` - Downstream search once required fields are filled
//! - `WidgetBackend` - The backend surface as the conversation engine sees it
//!
//! ## Infrastructure Ports
//!
//! - `RateLimiter` - Per-client request quotas

mod ai_provider;
mod moderator;
mod rate_limiter;
mod search_trigger;
mod session_store;
mod widget_backend;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, CompletionStream, FinishReason,
    ProviderInfo, RequestMetadata, ResponseFormat, StreamChunk, TokenUsage,
};
pub use moderator::{ModerationError, Moderator};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitQuota, RateLimitResult,
    RateLimitStatus, RateLimiter,
};
pub use search_trigger::{SearchTrigger, SearchTriggerError};
pub use session_store::{
    load, save, Persisted, SessionStore, SessionStoreError, StorageKey, STORAGE_VERSION,
};
pub use widget_backend::{BackendError, TextStream, TurnPayload, WidgetBackend};
