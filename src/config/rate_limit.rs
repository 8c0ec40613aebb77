//! Rate limit configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::ports::RateLimitQuota;

/// Per-IP request quota for the API
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u32,

    /// Requests allowed per client IP per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

impl RateLimitSettings {
    /// The quota to enforce, `None` when disabled.
    pub fn quota(&self) -> Option<RateLimitQuota> {
        self.enabled
            .then(|| RateLimitQuota::new(self.max_requests, self.window_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && (self.window_secs == 0 || self.max_requests == 0) {
            return Err(ValidationError::InvalidRateLimit);
        }
        Ok(())
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_window_secs() -> u32 {
    15 * 60
}

fn default_max_requests() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_100_per_15_minutes() {
        let quota = RateLimitSettings::default().quota().unwrap();
        assert_eq!(quota, RateLimitQuota::new(100, 900));
    }

    #[test]
    fn test_disabled_has_no_quota() {
        let settings = RateLimitSettings {
            enabled: false,
            ..Default::default()
        };
        assert!(settings.quota().is_none());
    }

    #[test]
    fn test_zero_window_is_invalid() {
        let settings = RateLimitSettings {
            window_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(ValidationError::InvalidRateLimit));
    }
}
