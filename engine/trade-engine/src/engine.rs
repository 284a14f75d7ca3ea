//! The buy/sell state machine.
//!
//! Both entry points walk the same states: validate the order, resolve
//! ownership, fetch one live price, run the affordability/ownership guard,
//! then mutate balance + position + log inside a single ledger unit. The
//! quote call (the only suspension-prone external I/O) always completes
//! before the unit begins, so no trade ever blocks another on a slow
//! network call while holding the write transaction.

use crate::config::EngineConfig;
use crate::error::{Result, TradeError};
use ledger_store::{
    Account, LedgerStore, Money, StoreError, Symbol, TradeSide, TransactionRecord,
};
use quote_service::{QuoteBatch, QuoteSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of an executed trade, as reported back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub transaction: TransactionRecord,
    pub new_balance: Money,
    pub new_position: u32,
}

/// TradeEngine orchestrates orders against the ledger store and the quote
/// source. Stateless between calls; safe to share behind `Arc`.
pub struct TradeEngine {
    store: LedgerStore,
    quotes: Arc<dyn QuoteSource>,
    config: EngineConfig,
}

impl TradeEngine {
    pub fn new(store: LedgerStore, quotes: Arc<dyn QuoteSource>, config: EngineConfig) -> Self {
        Self { store, quotes, config }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open an account with the configured opening balance and its reserved
    /// "All" portfolio.
    pub async fn open_account(&self, user_id: &str) -> Result<Account> {
        Ok(self.store.open_account(user_id, self.config.opening_balance).await?)
    }

    /// Add cash to an account, subject to the balance ceiling.
    pub async fn deposit(&self, user_id: &str, amount: Money) -> Result<Money> {
        if !amount.is_positive() {
            return Err(TradeError::InvalidDeposit { amount });
        }

        let mut unit = self.store.begin().await?;
        let new_balance = unit
            .adjust_balance(user_id, amount.cents(), self.config.max_balance)
            .await?;
        unit.commit().await?;

        tracing::info!(user_id, amount = %amount, balance = %new_balance, "deposit applied");
        Ok(new_balance)
    }

    /// Buy `shares` of `symbol` into a portfolio at the current market price.
    pub async fn buy(
        &self,
        user_id: &str,
        portfolio_id: i64,
        symbol: &str,
        shares: i64,
    ) -> Result<TradeOutcome> {
        let shares = validate_shares(shares)?;
        let symbol = Symbol::parse(symbol).map_err(TradeError::from)?;
        let portfolio = self.store.find_portfolio(user_id, portfolio_id).await?;

        let price = self.price_of(&symbol).await?;

        // Affordability guard against the price fetched above; the
        // saturated product still compares correctly, and the guarded
        // statements inside the unit re-verify at commit time.
        let balance = self.store.get_balance(user_id).await?;
        let total = price.saturating_mul(shares);
        if total > balance {
            return Err(TradeError::InsufficientFunds { required: total, available: balance });
        }

        let mut unit = self.store.begin().await.map_err(commit_error)?;
        let new_balance = unit
            .adjust_balance(user_id, -total.cents(), self.config.max_balance)
            .await
            .map_err(commit_error)?;
        let new_position = unit
            .upsert_position(portfolio.id, &symbol, i64::from(shares))
            .await
            .map_err(commit_error)?;
        let transaction = unit
            .append_transaction(portfolio.id, &symbol, TradeSide::Buy, shares, price)
            .await
            .map_err(commit_error)?;
        unit.commit().await.map_err(commit_error)?;

        tracing::info!(
            user_id,
            portfolio_id = portfolio.id,
            symbol = %symbol,
            shares,
            price = %price,
            total = %total,
            "buy executed"
        );

        Ok(TradeOutcome { transaction, new_balance, new_position })
    }

    /// Sell `shares` of `symbol` out of a portfolio at the current market
    /// price.
    pub async fn sell(
        &self,
        user_id: &str,
        portfolio_id: i64,
        symbol: &str,
        shares: i64,
    ) -> Result<TradeOutcome> {
        let shares = validate_shares(shares)?;
        let symbol = Symbol::parse(symbol).map_err(TradeError::from)?;
        let portfolio = self.store.find_portfolio(user_id, portfolio_id).await?;

        let price = self.price_of(&symbol).await?;

        let held = self.store.get_position(portfolio.id, &symbol).await?;
        if held < shares {
            return Err(TradeError::InsufficientShares { requested: shares, held });
        }
        let proceeds = match price.checked_mul(shares) {
            Some(proceeds) => proceeds,
            None => return Err(TradeError::LimitExceeded { limit: self.config.max_balance }),
        };

        let mut unit = self.store.begin().await.map_err(commit_error)?;
        let new_balance = unit
            .adjust_balance(user_id, proceeds.cents(), self.config.max_balance)
            .await
            .map_err(commit_error)?;
        let new_position = unit
            .upsert_position(portfolio.id, &symbol, -i64::from(shares))
            .await
            .map_err(commit_error)?;
        let transaction = unit
            .append_transaction(portfolio.id, &symbol, TradeSide::Sell, shares, price)
            .await
            .map_err(commit_error)?;
        unit.commit().await.map_err(commit_error)?;

        tracing::info!(
            user_id,
            portfolio_id = portfolio.id,
            symbol = %symbol,
            shares,
            price = %price,
            proceeds = %proceeds,
            "sell executed"
        );

        Ok(TradeOutcome { transaction, new_balance, new_position })
    }

    /// Fetch the current price for a single symbol. Any miss (transport
    /// down, symbol unknown, unusable price) is `PriceUnavailable`; the
    /// engine never substitutes a cached or stale price.
    async fn price_of(&self, symbol: &Symbol) -> Result<Money> {
        let request = vec![symbol.as_str().to_string()];
        let batch = self.quotes.quote(&request).await.map_err(|e| {
            tracing::warn!(symbol = %symbol, error = %e, "quote source failed");
            TradeError::PriceUnavailable { symbol: symbol.to_string() }
        })?;

        let quote = batch
            .get(symbol.as_str())
            .ok_or_else(|| TradeError::PriceUnavailable { symbol: symbol.to_string() })?;

        Money::try_from_decimal(quote.price)
            .filter(|price| price.is_positive())
            .ok_or_else(|| TradeError::PriceUnavailable { symbol: symbol.to_string() })
    }

    /// Batched quote for read paths: a wholesale oracle failure degrades to
    /// "every symbol unpriced" instead of failing the view.
    pub(crate) async fn quote_or_empty(&self, symbols: &[String]) -> QuoteBatch {
        if symbols.is_empty() {
            return QuoteBatch::default();
        }
        match self.quotes.quote(symbols).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, "quote source failed, serving unpriced view");
                QuoteBatch {
                    quotes: Default::default(),
                    failed: symbols.iter().cloned().collect(),
                }
            }
        }
    }

    /// Resolve a portfolio selector to the owned portfolio ids it covers.
    pub(crate) async fn resolve_selector(
        &self,
        user_id: &str,
        selector: crate::holdings::PortfolioSelector,
    ) -> Result<Vec<i64>> {
        match selector {
            crate::holdings::PortfolioSelector::All => {
                let portfolios = self.store.portfolios_for_user(user_id).await?;
                Ok(portfolios.into_iter().map(|p| p.id).collect())
            }
            crate::holdings::PortfolioSelector::Id(portfolio_id) => {
                let portfolio = self.store.find_portfolio(user_id, portfolio_id).await?;
                Ok(vec![portfolio.id])
            }
        }
    }
}

/// Map a store failure inside the atomic commit. The guards already passed
/// before the unit began, so a guard refusal here means a concurrent trade
/// landed in between: report `Conflict`, which is safe to retry.
fn commit_error(e: StoreError) -> TradeError {
    match e {
        StoreError::InsufficientFunds { .. } | StoreError::Conflict => TradeError::Conflict,
        StoreError::LimitExceeded { limit } => TradeError::LimitExceeded { limit },
        other => TradeError::Store(other),
    }
}

fn validate_shares(shares: i64) -> Result<u32> {
    match u32::try_from(shares) {
        Ok(shares) if shares > 0 => Ok(shares),
        _ => Err(TradeError::InvalidShares { given: shares }),
    }
}
