//! Position records: shares of one symbol held within one portfolio

use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};

/// Position represents a strictly positive share count for a
/// (portfolio, symbol) pair. A row exists iff shares > 0; sells that drain a
/// position to zero remove it entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub portfolio_id: i64,
    pub symbol: Symbol,
    pub shares: u32,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

/// Watchlist entry: a symbol pinned to a portfolio for display, with no
/// held quantity. Excluded from ledger invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEntry {
    pub portfolio_id: i64,
    pub symbol: Symbol,
    pub added_at: chrono::DateTime<chrono::Utc>,
}
