//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `ai` - OpenAI completions and moderation, plus mocks
//! - `storage` - Session stores (file, in-memory)
//! - `rate_limiter` - In-memory fixed-window limiter
//! - `search` - Search trigger handing snapshots to a consumer
//! - `widget_client` - The backend API as seen from an embedded widget
//! - `http` - The axum REST surface

pub mod ai;
pub mod http;
pub mod rate_limiter;
pub mod search;
pub mod storage;
pub mod widget_client;
