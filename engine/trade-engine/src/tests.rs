//! Flow tests for the trade engine against an in-memory ledger and a stub
//! quote source.

use crate::{
    EngineConfig, HoldingsView, PortfolioSelector, TradeEngine, TradeError, TradeSide,
};
use async_trait::async_trait;
use ledger_store::{LedgerStore, Money, StoreConfig, TransactionFilter};
use quote_service::{Quote, QuoteBatch, QuoteError, QuoteSource};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Deterministic in-memory quote source. Unknown symbols come back in
/// `failed`, like the real adapter; `fail_all` simulates a transport outage.
#[derive(Default)]
struct StubQuotes {
    prices: Mutex<HashMap<String, Quote>>,
    fail_all: AtomicBool,
}

impl StubQuotes {
    fn with_prices(pairs: &[(&str, &str)]) -> Arc<Self> {
        let stub = Arc::new(Self::default());
        for (symbol, price) in pairs {
            stub.set_price(symbol, price);
        }
        stub
    }

    fn set_price(&self, symbol: &str, price: &str) {
        let symbol = symbol.to_ascii_uppercase();
        let quote = Quote {
            symbol: symbol.clone(),
            display_name: Some(format!("{symbol} Inc.")),
            price: price.parse::<Decimal>().unwrap(),
        };
        self.prices.lock().unwrap().insert(symbol, quote);
    }

    fn drop_price(&self, symbol: &str) {
        self.prices.lock().unwrap().remove(&symbol.to_ascii_uppercase());
    }

    fn set_outage(&self, down: bool) {
        self.fail_all.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuoteSource for StubQuotes {
    async fn quote(&self, symbols: &[String]) -> quote_service::Result<QuoteBatch> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(QuoteError::Unavailable { status: 503 });
        }
        let prices = self.prices.lock().unwrap();
        let mut batch = QuoteBatch::default();
        for raw in symbols {
            let symbol = raw.trim().to_ascii_uppercase();
            match prices.get(&symbol) {
                Some(quote) => {
                    batch.quotes.insert(symbol, quote.clone());
                }
                None => {
                    batch.failed.insert(symbol);
                }
            }
        }
        Ok(batch)
    }
}

async fn engine_with(
    prices: &[(&str, &str)],
    config: EngineConfig,
) -> (TradeEngine, Arc<StubQuotes>) {
    let store = LedgerStore::connect(&StoreConfig::in_memory()).await.expect("in-memory store");
    let stub = StubQuotes::with_prices(prices);
    (TradeEngine::new(store, stub.clone(), config), stub)
}

async fn engine(prices: &[(&str, &str)]) -> (TradeEngine, Arc<StubQuotes>) {
    engine_with(prices, EngineConfig::default()).await
}

/// Opens an account for `user` and returns the id of its "All" portfolio.
async fn open(engine: &TradeEngine, user: &str) -> i64 {
    engine.open_account(user).await.unwrap();
    engine.store().portfolios_for_user(user).await.unwrap()[0].id
}

#[tokio::test]
async fn buy_debits_balance_and_opens_position() {
    let (engine, _) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "alice").await;

    let outcome = engine.buy("alice", all, "aapl", 10).await.unwrap();

    assert_eq!(outcome.new_balance, Money::from_cents(849_750)); // $8,497.50
    assert_eq!(outcome.new_position, 10);
    assert_eq!(outcome.transaction.side, TradeSide::Buy);
    assert_eq!(outcome.transaction.shares, 10);
    assert_eq!(outcome.transaction.price, Money::from_cents(15_025));
    assert_eq!(outcome.transaction.total(), Money::from_cents(150_250)); // $1,502.50

    assert_eq!(engine.store().get_balance("alice").await.unwrap(), Money::from_cents(849_750));
    let log = engine
        .store()
        .list_transactions("alice", &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn selling_out_deletes_the_position_row() {
    let (engine, stub) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "bob").await;

    engine.buy("bob", all, "AAPL", 10).await.unwrap();
    stub.set_price("AAPL", "160.00");

    let outcome = engine.sell("bob", all, "AAPL", 10).await.unwrap();

    // $8,497.50 + $1,600.00
    assert_eq!(outcome.new_balance, Money::from_cents(1_009_750));
    assert_eq!(outcome.new_position, 0);
    assert_eq!(outcome.transaction.side, TradeSide::Sell);

    let positions = engine.store().positions_for_portfolios(&[all]).await.unwrap();
    assert!(positions.is_empty());

    let log = engine
        .store()
        .list_transactions("bob", &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(log.len(), 2);
}

#[tokio::test]
async fn oversell_is_rejected_and_touches_nothing() {
    let (engine, _) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "carol").await;
    engine.buy("carol", all, "AAPL", 5).await.unwrap();

    let balance_before = engine.store().get_balance("carol").await.unwrap();

    let err = engine.sell("carol", all, "AAPL", 6).await.unwrap_err();
    assert!(matches!(err, TradeError::InsufficientShares { requested: 6, held: 5 }));

    assert_eq!(engine.store().get_balance("carol").await.unwrap(), balance_before);
    assert_eq!(
        engine
            .store()
            .get_position(all, &ledger_store::Symbol::parse("AAPL").unwrap())
            .await
            .unwrap(),
        5
    );
    let log = engine
        .store()
        .list_transactions("carol", &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(log.len(), 1); // only the seeding buy
}

#[tokio::test]
async fn unaffordable_buy_is_rejected_and_touches_nothing() {
    let (engine, _) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "dave").await;

    // 100 shares would cost $15,025.00 against a $10,000.00 balance.
    let err = engine.buy("dave", all, "AAPL", 100).await.unwrap_err();
    assert!(matches!(
        err,
        TradeError::InsufficientFunds { required, available }
            if required == Money::from_cents(1_502_500)
                && available == Money::from_cents(1_000_000)
    ));

    assert_eq!(engine.store().get_balance("dave").await.unwrap(), Money::from_cents(1_000_000));
    assert!(engine.store().positions_for_portfolios(&[all]).await.unwrap().is_empty());
    assert!(engine
        .store()
        .list_transactions("dave", &TransactionFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unknown_symbol_is_price_unavailable() {
    let (engine, _) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "erin").await;

    let err = engine.buy("erin", all, "ZZZZ", 1).await.unwrap_err();
    assert!(matches!(err, TradeError::PriceUnavailable { symbol } if symbol == "ZZZZ"));

    assert_eq!(engine.store().get_balance("erin").await.unwrap(), Money::from_cents(1_000_000));
}

#[tokio::test]
async fn quote_outage_is_price_unavailable() {
    let (engine, stub) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "frank").await;

    stub.set_outage(true);
    let err = engine.buy("frank", all, "AAPL", 1).await.unwrap_err();
    assert!(matches!(err, TradeError::PriceUnavailable { .. }));
}

#[tokio::test]
async fn bad_input_is_rejected_before_anything_else() {
    let (engine, _) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "gina").await;

    assert!(matches!(
        engine.buy("gina", all, "AAPL", 0).await.unwrap_err(),
        TradeError::InvalidShares { given: 0 }
    ));
    assert!(matches!(
        engine.buy("gina", all, "AAPL", -3).await.unwrap_err(),
        TradeError::InvalidShares { .. }
    ));
    assert!(matches!(
        engine.buy("gina", all, "NOTASYMBOL!", 1).await.unwrap_err(),
        TradeError::InvalidSymbol { .. }
    ));
    assert!(matches!(
        engine.buy("gina", 9_999, "AAPL", 1).await.unwrap_err(),
        TradeError::PortfolioNotFound { portfolio_id: 9_999 }
    ));

    // Ownership: another user's portfolio id is not found, not readable.
    open(&engine, "hank").await;
    assert!(matches!(
        engine.buy("hank", all, "AAPL", 1).await.unwrap_err(),
        TradeError::PortfolioNotFound { .. }
    ));
}

#[tokio::test]
async fn positions_replay_from_the_transaction_log() {
    let (engine, stub) = engine(&[("AAPL", "150.25"), ("MSFT", "300.00")]).await;
    let all = open(&engine, "iris").await;

    engine.buy("iris", all, "AAPL", 10).await.unwrap();
    engine.buy("iris", all, "MSFT", 4).await.unwrap();
    stub.set_price("AAPL", "149.00");
    engine.sell("iris", all, "AAPL", 3).await.unwrap();
    engine.buy("iris", all, "AAPL", 2).await.unwrap();
    stub.set_price("MSFT", "310.00");
    engine.sell("iris", all, "MSFT", 4).await.unwrap();

    for symbol in ["AAPL", "MSFT"] {
        let parsed = ledger_store::Symbol::parse(symbol).unwrap();
        let log = engine
            .store()
            .list_transactions(
                "iris",
                &TransactionFilter { symbol: Some(parsed.clone()), ..Default::default() },
            )
            .await
            .unwrap();

        let replayed: i64 = log
            .iter()
            .map(|t| match t.side {
                TradeSide::Buy => i64::from(t.shares),
                TradeSide::Sell => -i64::from(t.shares),
            })
            .sum();

        let stored = engine.store().get_position(all, &parsed).await.unwrap();
        assert_eq!(i64::from(stored), replayed, "ledger diverged for {symbol}");
    }
}

#[tokio::test]
async fn concurrent_sells_have_exactly_one_winner() {
    let (engine, _) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "jane").await;
    engine.buy("jane", all, "AAPL", 10).await.unwrap();

    let (first, second) = tokio::join!(
        engine.sell("jane", all, "AAPL", 10),
        engine.sell("jane", all, "AAPL", 10),
    );

    let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one concurrent sell may land");

    for result in [first, second] {
        if let Err(err) = result {
            assert!(
                matches!(err, TradeError::Conflict | TradeError::InsufficientShares { .. }),
                "loser saw {err:?}"
            );
        }
    }

    let aapl = ledger_store::Symbol::parse("AAPL").unwrap();
    assert_eq!(engine.store().get_position(all, &aapl).await.unwrap(), 0);
    // One buy and one sell at the same price: back to the opening balance.
    assert_eq!(engine.store().get_balance("jane").await.unwrap(), Money::from_cents(1_000_000));
    let log = engine
        .store()
        .list_transactions("jane", &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(log.len(), 2);
}

fn view_shares(view: &HoldingsView, symbol: &str) -> u32 {
    view.holdings
        .iter()
        .find(|h| h.symbol.as_str() == symbol)
        .map(|h| h.shares)
        .unwrap_or(0)
}

#[tokio::test]
async fn holdings_aggregate_across_portfolios_and_mark_unpriced() {
    let (engine, stub) =
        engine(&[("AAPL", "150.00"), ("MSFT", "300.00"), ("GONE", "50.00")]).await;
    let all = open(&engine, "kate").await;
    let tech = engine.store().create_portfolio("kate", "tech").await.unwrap();

    engine.buy("kate", all, "AAPL", 10).await.unwrap();
    engine.buy("kate", tech.id, "AAPL", 2).await.unwrap();
    engine.buy("kate", tech.id, "MSFT", 5).await.unwrap();
    engine.buy("kate", all, "GONE", 1).await.unwrap();

    // The source stops pricing GONE after the buy.
    stub.drop_price("GONE");

    let view = engine.get_holdings("kate", PortfolioSelector::All).await.unwrap();
    assert_eq!(view_shares(&view, "AAPL"), 12);
    assert_eq!(view_shares(&view, "MSFT"), 5);
    assert_eq!(view_shares(&view, "GONE"), 1);

    let gone = view.holdings.iter().find(|h| h.symbol.as_str() == "GONE").unwrap();
    assert!(gone.price.is_none());
    assert!(gone.market_value.is_none());
    assert_eq!(view.unpriced, vec![ledger_store::Symbol::parse("GONE").unwrap()]);

    // 12 * $150.00 + 5 * $300.00, with GONE explicitly excluded.
    assert_eq!(view.positions_value, Money::from_cents(330_000));
    assert_eq!(view.total_equity, view.cash_balance + view.positions_value);

    // The single-portfolio view only sees its own rows.
    let tech_view = engine.get_holdings("kate", PortfolioSelector::Id(tech.id)).await.unwrap();
    assert_eq!(view_shares(&tech_view, "AAPL"), 2);
    assert_eq!(view_shares(&tech_view, "MSFT"), 5);
    assert_eq!(view_shares(&tech_view, "GONE"), 0);
}

#[tokio::test]
async fn holdings_are_idempotent_between_trades() {
    let (engine, _) = engine(&[("AAPL", "150.00")]).await;
    let all = open(&engine, "liam").await;
    engine.buy("liam", all, "AAPL", 7).await.unwrap();

    let first = engine.get_holdings("liam", PortfolioSelector::All).await.unwrap();
    let second = engine.get_holdings("liam", PortfolioSelector::All).await.unwrap();

    assert_eq!(first.holdings.len(), second.holdings.len());
    for (a, b) in first.holdings.iter().zip(second.holdings.iter()) {
        assert_eq!(a.symbol, b.symbol);
        assert_eq!(a.shares, b.shares);
    }
    assert_eq!(first.cash_balance, second.cash_balance);
}

#[tokio::test]
async fn deposit_grows_balance_up_to_the_cap() {
    let config = EngineConfig {
        opening_balance: Money::from_cents(1_000_000),
        max_balance: Money::from_cents(1_200_000),
    };
    let (engine, _) = engine_with(&[], config).await;
    engine.open_account("mona").await.unwrap();

    let balance = engine.deposit("mona", Money::from_cents(100_000)).await.unwrap();
    assert_eq!(balance, Money::from_cents(1_100_000));

    let err = engine.deposit("mona", Money::from_cents(200_000)).await.unwrap_err();
    assert!(matches!(err, TradeError::LimitExceeded { .. }));
    assert_eq!(engine.store().get_balance("mona").await.unwrap(), Money::from_cents(1_100_000));

    let err = engine.deposit("mona", Money::ZERO).await.unwrap_err();
    assert!(matches!(err, TradeError::InvalidDeposit { .. }));
}

#[tokio::test]
async fn sale_proceeds_respect_the_balance_cap() {
    let config = EngineConfig {
        opening_balance: Money::from_cents(1_000_000),
        max_balance: Money::from_cents(1_050_000),
    };
    let (engine, stub) = engine_with(&[("AAPL", "150.25")], config).await;
    let all = open(&engine, "nina").await;

    engine.buy("nina", all, "AAPL", 1).await.unwrap();
    stub.set_price("AAPL", "1000.00");

    let err = engine.sell("nina", all, "AAPL", 1).await.unwrap_err();
    assert!(matches!(err, TradeError::LimitExceeded { .. }));

    // The rejected sell left the position and log untouched.
    let aapl = ledger_store::Symbol::parse("AAPL").unwrap();
    assert_eq!(engine.store().get_position(all, &aapl).await.unwrap(), 1);
    let log = engine
        .store()
        .list_transactions("nina", &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn history_degrades_to_symbol_only_when_quotes_fail() {
    let (engine, stub) = engine(&[("AAPL", "150.25")]).await;
    let all = open(&engine, "omar").await;
    engine.buy("omar", all, "AAPL", 2).await.unwrap();

    let entries = engine.list_transactions("omar", &TransactionFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].display_name.as_deref(), Some("AAPL Inc."));
    assert_eq!(entries[0].total(), Money::from_cents(30_050));

    stub.set_outage(true);
    let entries = engine.list_transactions("omar", &TransactionFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1, "history must not fail with the quote source down");
    assert!(entries[0].display_name.is_none());
}

#[tokio::test]
async fn watchlist_round_trip_with_quotes() {
    let (engine, _) = engine(&[("NVDA", "90.55")]).await;
    let all = open(&engine, "pria").await;

    engine.add_watch("pria", all, "nvda").await.unwrap();
    engine.add_watch("pria", all, "MYST").await.unwrap(); // never priced

    let rows = engine.watchlist("pria", PortfolioSelector::All).await.unwrap();
    assert_eq!(rows.len(), 2);

    let nvda = rows.iter().find(|r| r.symbol.as_str() == "NVDA").unwrap();
    assert_eq!(nvda.price, Some(Money::from_cents(9_055)));
    let myst = rows.iter().find(|r| r.symbol.as_str() == "MYST").unwrap();
    assert!(myst.price.is_none());

    assert!(engine.remove_watch("pria", all, "NVDA").await.unwrap());
    assert!(!engine.remove_watch("pria", all, "NVDA").await.unwrap());
}
