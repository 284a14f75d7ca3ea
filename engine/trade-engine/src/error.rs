//! Error types for the trade engine
//!
//! Every rejection a caller can act on is its own variant; the HTTP layer
//! above maps them to statuses and never has to string-match.

use ledger_store::{Money, StoreError};
use thiserror::Error;

/// Result type for trade engine operations
pub type Result<T> = std::result::Result<T, TradeError>;

#[derive(Error, Debug)]
pub enum TradeError {
    #[error("share count must be a positive whole number, got {given}")]
    InvalidShares { given: i64 },

    #[error("invalid symbol: {given:?}")]
    InvalidSymbol { given: String },

    #[error("portfolio not found: {portfolio_id}")]
    PortfolioNotFound { portfolio_id: i64 },

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("no current price available for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },

    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: u32, held: u32 },

    #[error("trade conflicted with a concurrent mutation, safe to retry")]
    Conflict,

    #[error("balance limit exceeded: cap {limit}")]
    LimitExceeded { limit: Money },

    #[error("deposit amount must be positive, got {amount}")]
    InvalidDeposit { amount: Money },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("ledger error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for TradeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AccountNotFound(user_id) => TradeError::AccountNotFound(user_id),
            StoreError::AccountExists(user_id) => TradeError::AccountExists(user_id),
            StoreError::PortfolioNotFound { portfolio_id } => {
                TradeError::PortfolioNotFound { portfolio_id }
            }
            StoreError::InvalidSymbol { given } => TradeError::InvalidSymbol { given },
            StoreError::InsufficientFunds { required, available } => {
                TradeError::InsufficientFunds { required, available }
            }
            StoreError::LimitExceeded { limit } => TradeError::LimitExceeded { limit },
            StoreError::Conflict => TradeError::Conflict,
            other => TradeError::Store(other),
        }
    }
}
