//! Configuration loading and validation for the back office engine.
//!
//! Uses serde_yaml to load YAML configuration files with support for
//! environment variable overrides for deployment-specific values.

mod app;
mod duration;
mod error;
mod policy;
mod storage;

pub use app::AppConfig;
pub use error::ConfigError;
pub use policy::PolicyConfig;
pub use storage::StorageConfig;

use serde::Deserialize;
use std::{env, fs};

/// Environment variable that overrides `storage.path`.
pub const DB_PATH_ENV: &str = "BACKOFFICE_DB_PATH";

/// Root configuration structure.
///
/// Required sections: app, storage.
/// Optional sections: policy.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application-level settings like name and environment.
    pub app: AppConfig,
    /// SQLite database location and pool settings.
    pub storage: StorageConfig,
    /// Order and payment business rules (optional).
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// First loads environment variables from `.env` file (if exists),
    /// then loads the YAML config and applies overrides:
    /// - `BACKOFFICE_DB_PATH` replaces `storage.path`
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore error if not found)
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from environment variables.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var(DB_PATH_ENV) {
            if !path.trim().is_empty() {
                self.storage.path = path;
            }
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.is_empty() {
            return Err(ConfigError::Validation("app.name is required".into()));
        }

        if self.storage.path.trim().is_empty() {
            return Err(ConfigError::Validation("storage.path is required".into()));
        }

        if let Some(max_connections) = self.storage.max_connections {
            if max_connections == 0 {
                return Err(ConfigError::Validation(
                    "storage.max_connections must be positive".into(),
                ));
            }
        }

        let prefix = &self.policy.order_number_prefix;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(format!(
                "policy.order_number_prefix must be non-empty and alphanumeric, got {:?}",
                prefix
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
