//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and `DIRHUB__`-prefixed environment variables. Each
//! sub-module represents a logical configuration section.

pub mod controller;
pub mod database;
pub mod logging;
pub mod notifier;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::controller::ControllerConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::notifier::{NotifierBackend, NotifierConfig, RetryConfig};
pub use self::store::StoreConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Directory store mode.
    #[serde(default)]
    pub store: StoreConfig,
    /// Event publication settings.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Application controller settings.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `config/default.toml` with the `config/{env}.toml` overlay and
    /// environment variables prefixed with `DIRHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("DIRHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an inline TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.controller.sweep_min_seconds > self.controller.sweep_max_seconds {
            return Err(AppError::configuration(
                "controller.sweep_min_seconds must not exceed controller.sweep_max_seconds",
            ));
        }
        if self.notifier.backend == NotifierBackend::Redis && self.notifier.redis_url.is_none() {
            return Err(AppError::configuration(
                "notifier.redis_url is required for the redis backend",
            ));
        }
        if self.notifier.retry.multiplier < 1.0 {
            return Err(AppError::configuration(
                "notifier.retry.multiplier must be at least 1.0",
            ));
        }
        Ok(())
    }
}
