//! Error types for the ledger store

use crate::money::Money;
use thiserror::Error;

/// Result type for ledger store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("portfolio not found: {portfolio_id}")]
    PortfolioNotFound { portfolio_id: i64 },

    #[error("portfolio name already in use: {name}")]
    DuplicateName { name: String },

    #[error("portfolio name is reserved: {name}")]
    ReservedName { name: String },

    #[error("portfolio name too long: {name} (max {max} characters)")]
    NameTooLong { name: String, max: usize },

    #[error("portfolio name is empty")]
    EmptyName,

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("invalid symbol: {given:?}")]
    InvalidSymbol { given: String },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },

    #[error("balance limit exceeded: cap {limit}")]
    LimitExceeded { limit: Money },

    #[error("write conflicted with a concurrent mutation")]
    Conflict,

    #[error("ledger integrity violation: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            // A busy/locked database means we raced another writer; callers
            // may retry. A CHECK violation means a guarded statement let a
            // bad row through, which is fatal.
            let message = db.message();
            if message.contains("database is locked") || message.contains("database table is locked") {
                return StoreError::Conflict;
            }
            if matches!(db.kind(), sqlx::error::ErrorKind::CheckViolation) {
                return StoreError::Integrity(message.to_string());
            }
        }
        StoreError::Database(e)
    }
}

/// True when the underlying driver reported a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db)
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation))
}
