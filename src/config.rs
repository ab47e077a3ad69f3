//! Configuration and settings management
//!
//! Loads settings from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Default cap on concurrent outbound AI requests
///
/// The single configuration point for gate capacity; every consumer
/// sizes the gate from [`Settings::ai_max_concurrency`], which falls
/// back to this constant.
pub const DEFAULT_AI_MAX_CONCURRENCY: usize = 20;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Maximum number of AI requests allowed in flight at once
    #[serde(default = "default_ai_max_concurrency")]
    pub ai_max_concurrency: usize,
}

const fn default_ai_max_concurrency() -> usize {
    DEFAULT_AI_MAX_CONCURRENCY
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai_max_concurrency: DEFAULT_AI_MAX_CONCURRENCY,
        }
    }
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pandapal_gate::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            // Eg.. `APP_AI_MAX_CONCURRENCY=8 ./target/app` would set the key
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Also add settings from environment variables directly (without prefix)
            // Note: Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case
            // try_parsing is needed for the integer field; ignore_empty treats
            // empty env vars as unset
            .add_source(Environment::default().ignore_empty(true).try_parsing(true))
            .build()?;

        s.try_deserialize()
    }
}
