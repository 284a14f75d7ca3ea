//! Configuration for the quote service

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Quote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Base URL of the external quote source
    pub api_base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: "paper-trader/0.1".to_string(),
        }
    }
}

impl QuoteConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self, crate::QuoteError> {
        let defaults = Self::default();

        let api_base_url = std::env::var("QUOTE_API_BASE_URL").unwrap_or(defaults.api_base_url);

        let timeout = match std::env::var("QUOTE_TIMEOUT_MS") {
            Ok(raw) => {
                let ms = raw.parse::<u64>().map_err(|_| crate::QuoteError::InvalidConfig {
                    message: "invalid QUOTE_TIMEOUT_MS".to_string(),
                })?;
                Duration::from_millis(ms)
            }
            Err(_) => defaults.timeout,
        };

        Ok(Self { api_base_url, timeout, user_agent: defaults.user_agent })
    }
}
