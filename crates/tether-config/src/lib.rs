//! # tether-config
//!
//! Layered configuration loading for Tether using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TETHER_*` prefix, `__` as separator)
//! 2. Project-level `.tether/config.toml`
//! 3. User-level `~/.config/tether/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `TETHER_DATABASE__DATA_DIR` -> `database.data_dir`,
//! `TETHER_AUDIT__CHECK_TIMEOUT_SECS` -> `audit.check_timeout_secs`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use tether_config::TetherConfig;
//!
//! let config = TetherConfig::load_with_dotenv().expect("config");
//! println!("auditing databases under {}", config.database.data_dir.display());
//! ```

mod audit;
mod database;
mod error;
mod server;

pub use audit::AuditConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use server::ServerConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TetherConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl TetherConfig {
    /// Load configuration from all sources (TOML files + environment variables)
    /// and validate it.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is out of range.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Extract and validate from an arbitrary figment (tests layer their own providers).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is out of range.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".tether/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("TETHER_").split("__"))
    }

    /// Reject values that would make an audit run impossible.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.audit.check_timeout_secs == 0 {
            return Err(invalid("audit.check_timeout_secs", "must be greater than zero"));
        }
        if self.audit.audit_timeout_secs == 0 {
            return Err(invalid("audit.audit_timeout_secs", "must be greater than zero"));
        }
        if self.audit.max_concurrency == 0 {
            return Err(invalid("audit.max_concurrency", "must be greater than zero"));
        }
        if self.server.bind.trim().is_empty() {
            return Err(invalid("server.bind", "must not be empty"));
        }
        if self.server.workers == 0 {
            return Err(invalid("server.workers", "must be greater than zero"));
        }
        if self.database.data_dir.as_os_str().is_empty() {
            return Err(invalid("database.data_dir", "must not be empty"));
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tether").join("config.toml"))
    }
}
