//! Watchlist read/write path. Presentational only: entries carry no
//! quantity and sit outside the ledger invariants.

use crate::engine::TradeEngine;
use crate::error::{Result, TradeError};
use crate::holdings::PortfolioSelector;
use ledger_store::{Money, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One watched symbol with a best-effort live quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchQuote {
    pub symbol: Symbol,
    pub display_name: Option<String>,
    pub price: Option<Money>,
}

impl TradeEngine {
    /// Pin a symbol to a portfolio's watchlist. Idempotent; no price lookup
    /// is required to watch a symbol.
    pub async fn add_watch(&self, user_id: &str, portfolio_id: i64, symbol: &str) -> Result<()> {
        let symbol = Symbol::parse(symbol).map_err(TradeError::from)?;
        let portfolio = self.store().find_portfolio(user_id, portfolio_id).await?;
        Ok(self.store().add_watch(portfolio.id, &symbol).await?)
    }

    /// Remove a watchlist entry; returns whether one existed.
    pub async fn remove_watch(
        &self,
        user_id: &str,
        portfolio_id: i64,
        symbol: &str,
    ) -> Result<bool> {
        let symbol = Symbol::parse(symbol).map_err(TradeError::from)?;
        let portfolio = self.store().find_portfolio(user_id, portfolio_id).await?;
        Ok(self.store().remove_watch(portfolio.id, &symbol).await?)
    }

    /// Watched symbols across the selected portfolios, de-duplicated and
    /// joined with live quotes. Symbols the source cannot price come back
    /// with `price: None`.
    pub async fn watchlist(
        &self,
        user_id: &str,
        selector: PortfolioSelector,
    ) -> Result<Vec<WatchQuote>> {
        let portfolio_ids = self.resolve_selector(user_id, selector).await?;
        let entries = self.store().watched_entries(&portfolio_ids).await?;

        let watched: BTreeSet<Symbol> =
            entries.into_iter().map(|entry| entry.symbol).collect();
        let symbols: Vec<String> =
            watched.iter().map(|symbol| symbol.as_str().to_string()).collect();
        let batch = self.quote_or_empty(&symbols).await;

        Ok(watched
            .into_iter()
            .map(|symbol| {
                let quote = batch.get(symbol.as_str());
                WatchQuote {
                    display_name: quote.and_then(|q| q.display_name.clone()),
                    price: quote.and_then(|q| Money::try_from_decimal(q.price)),
                    symbol,
                }
            })
            .collect())
    }
}
