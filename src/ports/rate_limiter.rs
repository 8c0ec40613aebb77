//! Rate limiting port for protecting the model-backed endpoints.
//!
//! Requests are counted per key in fixed windows; the caller supplies the
//! quota so one limiter can serve several policies.

use async_trait::async_trait;
use std::fmt;

use crate::domain::foundation::Timestamp;

/// Port for rate limiting operations.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check if request is allowed, counting it if so.
    async fn check(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
    ) -> Result<RateLimitResult, RateLimitError>;

    /// Clears the current window for a key, restoring full quota.
    async fn reset(&self, key: &RateLimitKey) -> Result<(), RateLimitError>;
}

/// Key identifying what to rate limit.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum RateLimitKey {
    /// Per client IP address.
    Ip(String),
    /// One bucket shared by all callers.
    Global,
}

impl RateLimitKey {
    pub fn ip(ip: impl Into<String>) -> Self {
        RateLimitKey::Ip(ip.into())
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitKey::Ip(ip) => write!(f, "ratelimit:ip:{}", ip),
            RateLimitKey::Global => write!(f, "ratelimit:global"),
        }
    }
}

/// Requests allowed per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitQuota {
    pub max_requests: u32,
    pub window_secs: u32,
}

impl RateLimitQuota {
    pub fn new(max_requests: u32, window_secs: u32) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    Allowed(RateLimitStatus),
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }
}

/// Current rate limit status.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: Timestamp,
}

/// Details of a rate limit denial.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    pub limit: u32,
    /// Seconds until the client should retry.
    pub retry_after_secs: u32,
    pub message: String,
}

/// Errors that can occur during rate limiting operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}
