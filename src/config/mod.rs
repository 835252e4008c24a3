//! Application configuration module
//!
//! Configuration is loaded from environment variables with the
//! `DISPATCH_HUB` prefix; nested values use double underscores.
//!
//! # Example
//!
//! ```no_run
//! use dispatch_hub::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod hub;
mod server;

pub use error::{ConfigError, ValidationError};
pub use hub::HubConfig;
pub use server::{LogFormat, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Listener, logging and CORS
    #[serde(default)]
    pub server: ServerConfig,

    /// Hub tuning (dedup, backfill, delivery, inbox)
    #[serde(default)]
    pub hub: HubConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `DISPATCH_HUB` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `DISPATCH_HUB__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `DISPATCH_HUB__HUB__BACKFILL_LIMIT=50` -> `hub.backfill_limit = 50`
    ///
    /// Every value has a default, so an empty environment is valid.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DISPATCH_HUB")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.hub.validate()?;
        Ok(())
    }
}
