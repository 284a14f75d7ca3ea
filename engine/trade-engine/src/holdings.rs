//! Position query service: current holdings joined with live prices.

use crate::engine::TradeEngine;
use crate::error::{Result, TradeError};
use ledger_store::{Money, StoreError, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which portfolios a read covers: one of the user's portfolios, or the
/// reserved "All" aggregation view spanning every portfolio they own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortfolioSelector {
    All,
    Id(i64),
}

/// One held symbol with its live valuation. `price` is `None` when the
/// quote source could not price the symbol; the row is still present so the
/// caller sees the full position set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: Symbol,
    pub display_name: Option<String>,
    pub shares: u32,
    pub price: Option<Money>,
    pub market_value: Option<Money>,
}

/// Aggregated holdings for a portfolio selection. `positions_value` sums
/// only the priced rows; `unpriced` names the symbols it excludes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingsView {
    pub cash_balance: Money,
    pub holdings: Vec<Holding>,
    pub positions_value: Money,
    pub total_equity: Money,
    pub unpriced: Vec<Symbol>,
}

impl TradeEngine {
    /// Current holdings for a portfolio (or the "All" view), grouped by
    /// symbol and valued with one batched quote call. Read-only: positions
    /// come from a single consistency snapshot, and no atomic unit is held
    /// across the price lookup.
    pub async fn get_holdings(
        &self,
        user_id: &str,
        selector: PortfolioSelector,
    ) -> Result<HoldingsView> {
        let cash_balance = self.store().get_balance(user_id).await?;
        let portfolio_ids = self.resolve_selector(user_id, selector).await?;
        let positions = self.store().positions_for_portfolios(&portfolio_ids).await?;

        let mut by_symbol: BTreeMap<Symbol, u32> = BTreeMap::new();
        for position in positions {
            let entry = by_symbol.entry(position.symbol).or_insert(0);
            *entry = entry.checked_add(position.shares).ok_or_else(|| {
                TradeError::Store(StoreError::Integrity(
                    "aggregated share count out of range".to_string(),
                ))
            })?;
        }

        let symbols: Vec<String> =
            by_symbol.keys().map(|symbol| symbol.as_str().to_string()).collect();
        let batch = self.quote_or_empty(&symbols).await;

        let mut holdings = Vec::with_capacity(by_symbol.len());
        let mut unpriced = Vec::new();
        let mut positions_value = Money::ZERO;

        for (symbol, shares) in by_symbol {
            let quote = batch.get(symbol.as_str());
            let price = quote.and_then(|q| Money::try_from_decimal(q.price));
            let market_value = price.and_then(|p| p.checked_mul(shares));

            match market_value {
                Some(value) => positions_value = positions_value.saturating_add(value),
                None => unpriced.push(symbol.clone()),
            }

            holdings.push(Holding {
                display_name: quote.and_then(|q| q.display_name.clone()),
                symbol,
                shares,
                price,
                market_value,
            });
        }

        let total_equity = cash_balance.saturating_add(positions_value);

        Ok(HoldingsView { cash_balance, holdings, positions_value, total_equity, unpriced })
    }
}
