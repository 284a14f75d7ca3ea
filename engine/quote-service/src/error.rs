//! Error types for the quote service

use thiserror::Error;

/// Result type for quote service operations
pub type Result<T> = std::result::Result<T, QuoteError>;

/// Wholesale failures of the quote source. Per-symbol misses are not errors;
/// they come back in [`crate::QuoteBatch::failed`].
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("quote transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("quote source unavailable: HTTP {status}")]
    Unavailable { status: u16 },

    #[error("malformed quote payload: {0}")]
    BadPayload(String),

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}
