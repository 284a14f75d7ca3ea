//! TradeEngine - buy/sell orchestration for the paper-trading ledger
//!
//! The engine is the only writer of the ledger: every buy/sell validates the
//! order, prices it against the live quote source, checks
//! affordability/ownership, and commits balance + position + transaction
//! log mutations as one atomic unit. The read paths (holdings, history,
//! watchlist) join ledger state with batched live quotes and degrade
//! per-symbol when the quote source misbehaves.

mod config;
mod engine;
mod error;
mod history;
mod holdings;
mod watchlist;

pub use config::EngineConfig;
pub use engine::{TradeEngine, TradeOutcome};
pub use error::{Result, TradeError};
pub use history::HistoryEntry;
pub use holdings::{Holding, HoldingsView, PortfolioSelector};
pub use watchlist::WatchQuote;

// Re-export commonly used types
pub use ledger_store::{
    Account, LedgerStore, Money, Portfolio, StoreConfig, Symbol, TradeSide, TransactionFilter,
    TransactionRecord,
};
pub use quote_service::{QuoteConfig, QuoteSource, YahooQuoteClient};

#[cfg(test)]
mod tests;
