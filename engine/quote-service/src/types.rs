//! Quote types returned by the adapter

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One quoted symbol: display name and current price, rounded half-up to
/// cents by the adapter. The price is always strictly positive; a source
/// that reports a missing or non-positive price lands the symbol in
/// [`QuoteBatch::failed`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub display_name: Option<String>,
    pub price: Decimal,
}

/// Result of one batched quote call. Keys of `quotes` and members of
/// `failed` are the normalized (uppercase) request symbols; every requested
/// symbol appears in exactly one of the two.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteBatch {
    pub quotes: HashMap<String, Quote>,
    pub failed: BTreeSet<String>,
}

impl QuoteBatch {
    /// Look up a quote by (already normalized) symbol.
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }
}
