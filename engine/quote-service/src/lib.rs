//! QuoteService - adapter over the external market-data source
//!
//! Wraps the external quote endpoint behind [`QuoteSource`]: one batched
//! call for 1..N symbols returning price and display name per symbol, with
//! per-symbol failures reported alongside the successes. The adapter only
//! errors wholesale when the transport itself fails; it never substitutes a
//! zero or stale price for a symbol the source did not answer for.

mod config;
mod error;
mod service;
mod types;

pub use config::QuoteConfig;
pub use error::{QuoteError, Result};
pub use service::{
    batch_from_payload, QuotePayload, QuoteResponseBody, QuoteResult, QuoteSource,
    YahooQuoteClient,
};
pub use types::{Quote, QuoteBatch};
