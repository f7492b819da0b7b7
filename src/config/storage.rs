//! Storage configuration.

use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// SQLite database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file (overridden by BACKOFFICE_DB_PATH).
    pub path: String,
    /// Maximum number of pooled connections.
    pub max_connections: Option<u32>,
    /// How long a writer waits for the database lock before giving up.
    #[serde(default, with = "duration")]
    pub busy_timeout: Duration,
}
