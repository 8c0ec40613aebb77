//! HTTP middleware for axum.
//!
//! - `rate_limit` - Per-IP fixed-window request quotas
//! - `sanitize` - HTML stripping and body shape checks before any handler

pub mod rate_limit;
pub mod sanitize;

pub use rate_limit::{rate_limit_middleware, RateLimitState};
pub use sanitize::{sanitize_body, sanitize_middleware};
