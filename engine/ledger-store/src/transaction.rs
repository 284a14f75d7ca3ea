//! Immutable trade log records and history filters

use crate::money::Money;
use crate::symbol::{Symbol, TradeSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// TransactionRecord is one executed trade, appended to the ledger at commit
/// time and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub portfolio_id: i64,
    pub symbol: Symbol,
    pub side: TradeSide,
    pub shares: u32,
    /// Price per share at execution, already rounded to cents at quote time.
    pub price: Money,
    pub occurred_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Total traded value, recomputed from its factors. Saturates on
    /// overflow rather than misreporting a wrapped total.
    pub fn total(&self) -> Money {
        self.price.saturating_mul(self.shares)
    }
}

/// Filters for reading the transaction log. All fields are conjunctive;
/// `None` leaves that dimension unfiltered.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub portfolio: Option<i64>,
    pub symbol: Option<Symbol>,
    pub side: Option<TradeSide>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Page size; `None` means the store default of 100.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
