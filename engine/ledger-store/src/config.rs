//! Configuration for the ledger store

use serde::{Deserialize, Serialize};

/// Ledger store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite connection URL
    pub url: String,
    pub max_connections: u32,
    /// How long a writer waits on a locked database before the attempt is
    /// reported as a conflict.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://paper_ledger.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// In-memory database for tests and throwaway runs. Pinned to a single
    /// connection: every pooled connection would otherwise get its own
    /// private memory database.
    pub fn in_memory() -> Self {
        Self { url: "sqlite::memory:".to_string(), max_connections: 1, ..Self::default() }
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self, crate::StoreError> {
        let defaults = Self::default();

        let url = std::env::var("DATABASE_URL").unwrap_or(defaults.url);

        let max_connections = match std::env::var("LEDGER_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse::<u32>().map_err(|_| crate::StoreError::InvalidConfig {
                message: "invalid LEDGER_MAX_CONNECTIONS".to_string(),
            })?,
            Err(_) => defaults.max_connections,
        };

        let busy_timeout_ms = match std::env::var("LEDGER_BUSY_TIMEOUT_MS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| crate::StoreError::InvalidConfig {
                message: "invalid LEDGER_BUSY_TIMEOUT_MS".to_string(),
            })?,
            Err(_) => defaults.busy_timeout_ms,
        };

        Ok(Self { url, max_connections, busy_timeout_ms })
    }
}
