//! In-memory rate limiter.
//!
//! Uses a fixed-window counter per key in a HashMap. Suitable for a single
//! server process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitQuota, RateLimitResult,
    RateLimitStatus, RateLimiter,
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryRateLimiter {
    windows: Arc<RwLock<HashMap<RateLimitKey, WindowState>>>,
}

/// State for a single rate limit window.
#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    /// Unix seconds when the window opened.
    window_start: u64,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops windows that closed before `now`.
    pub async fn prune(&self, quota: RateLimitQuota) {
        let now = Timestamp::now().as_unix_secs();
        self.windows
            .write()
            .await
            .retain(|_, state| now < state.window_start + u64::from(quota.window_secs));
    }

    async fn check_at(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
        now: u64,
    ) -> RateLimitResult {
        let window_secs = u64::from(quota.window_secs);
        let mut windows = self.windows.write().await;

        let state = windows.entry(key.clone()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        if now >= state.window_start + window_secs {
            state.count = 0;
            state.window_start = now;
        }

        let window_end = state.window_start + window_secs;
        let secs_left = window_end.saturating_sub(now);

        if state.count >= quota.max_requests {
            let retry_after = (secs_left as u32).max(1);
            return RateLimitResult::Denied(RateLimitDenied {
                limit: quota.max_requests,
                retry_after_secs: retry_after,
                message: "Too many requests from this IP, please try again later.".to_string(),
            });
        }

        state.count += 1;
        RateLimitResult::Allowed(RateLimitStatus {
            limit: quota.max_requests,
            remaining: quota.max_requests.saturating_sub(state.count),
            reset_at: Timestamp::now().plus_secs(secs_left),
        })
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
    ) -> Result<RateLimitResult, RateLimitError> {
        Ok(self.check_at(key, quota, Timestamp::now().as_unix_secs()).await)
    }

    async fn reset(&self, key: &RateLimitKey) -> Result<(), RateLimitError> {
        self.windows.write().await.remove(key);
        Ok(())
    }
}
