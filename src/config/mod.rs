//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHAT_WIDGET` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use chat_widget::config::AppConfig;
//!
//! # fn main() -> Result<(), chat_widget::config::ConfigError> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//!
//! println!("Server running on {}", config.server.socket_addr()?);
//! # Ok(())
//! # }
//! ```

mod ai;
mod error;
mod rate_limit;
mod server;
mod widget;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use rate_limit::RateLimitSettings;
pub use server::{Environment, ServerConfig};
pub use widget::{WidgetConfig, WidgetDefinition};

use serde::Deserialize;

use crate::adapters::http::HttpSettings;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, CORS)
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenAI configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Widget definition file, match threshold and search switches
    #[serde(default)]
    pub widget: WidgetConfig,

    /// Per-IP request quota
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHAT_WIDGET` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHAT_WIDGET__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_WIDGET__AI__OPENAI_API_KEY=...` -> `ai.openai_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_WIDGET")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// The OpenAI key may only be missing in development, where the server
    /// falls back to the mock provider.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.ai
            .validate(self.server.environment != Environment::Development)?;
        self.widget.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Settings for the HTTP layers.
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            allowed_origins: self.server.allowed_origins_list(),
            request_timeout: self.server.request_timeout(),
            rate_limit: self.rate_limit.quota(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "CHAT_WIDGET__AI__OPENAI_API_KEY",
        "CHAT_WIDGET__SERVER__PORT",
        "CHAT_WIDGET__SERVER__ENVIRONMENT",
        "CHAT_WIDGET__WIDGET__MATCH_THRESHOLD",
        "CHAT_WIDGET__WIDGET__REQUIRE_MANUAL_SEARCH",
        "CHAT_WIDGET__RATE_LIMIT__MAX_REQUESTS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        clear_env();
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_defaults_without_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.widget.match_threshold, 0.65);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_values_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("CHAT_WIDGET__SERVER__PORT", "3000"),
            ("CHAT_WIDGET__WIDGET__MATCH_THRESHOLD", "0.8"),
            ("CHAT_WIDGET__WIDGET__REQUIRE_MANUAL_SEARCH", "true"),
            ("CHAT_WIDGET__RATE_LIMIT__MAX_REQUESTS", "10"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.widget.match_threshold, 0.8);
        assert!(config.widget.require_manual_search);
        assert_eq!(config.http_settings().rate_limit.unwrap().max_requests, 10);
    }

    #[test]
    fn test_production_requires_openai_key() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("CHAT_WIDGET__SERVER__ENVIRONMENT", "production")]).unwrap();

        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("OPENAI_API_KEY"))
        );
    }

    #[test]
    fn test_production_with_key_is_valid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("CHAT_WIDGET__SERVER__ENVIRONMENT", "production"),
            ("CHAT_WIDGET__AI__OPENAI_API_KEY", "sk-test"),
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        assert!(config.ai.has_openai());
    }

    #[test]
    fn test_invalid_threshold_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("CHAT_WIDGET__WIDGET__MATCH_THRESHOLD", "2")]).unwrap();

        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidMatchThreshold(2.0))
        );
    }
}
