//! Configuration for the trade engine

use ledger_store::Money;
use serde::{Deserialize, Serialize};

/// Trade engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cash balance granted when an account is opened.
    pub opening_balance: Money,
    /// Ceiling on any account balance. Deposits and sale proceeds that would
    /// pass it are rejected with `LimitExceeded`.
    pub max_balance: Money,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            opening_balance: Money::from_cents(1_000_000), // $10,000.00
            max_balance: Money::from_cents(10_000_000_000), // $100,000,000.00
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self, crate::TradeError> {
        let defaults = Self::default();

        let opening_balance = match std::env::var("OPENING_BALANCE_CENTS") {
            Ok(raw) => {
                let cents = raw.parse::<i64>().map_err(|_| crate::TradeError::InvalidConfig {
                    message: "invalid OPENING_BALANCE_CENTS".to_string(),
                })?;
                Money::from_cents(cents)
            }
            Err(_) => defaults.opening_balance,
        };

        let max_balance = match std::env::var("MAX_BALANCE_CENTS") {
            Ok(raw) => {
                let cents = raw.parse::<i64>().map_err(|_| crate::TradeError::InvalidConfig {
                    message: "invalid MAX_BALANCE_CENTS".to_string(),
                })?;
                Money::from_cents(cents)
            }
            Err(_) => defaults.max_balance,
        };

        if opening_balance > max_balance {
            return Err(crate::TradeError::InvalidConfig {
                message: "OPENING_BALANCE_CENTS exceeds MAX_BALANCE_CENTS".to_string(),
            });
        }

        Ok(Self { opening_balance, max_balance })
    }
}
