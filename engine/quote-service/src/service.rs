//! Quote source trait and the HTTP client over the external market API.

use crate::config::QuoteConfig;
use crate::error::{QuoteError, Result};
use crate::types::{Quote, QuoteBatch};
use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

/// A batched price oracle: given 1..N symbols, returns a price and display
/// name per symbol, or a per-symbol failure. Implementations only error
/// wholesale when the source itself is unreachable.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, symbols: &[String]) -> Result<QuoteBatch>;
}

/// Quote client for the Yahoo-style `/v7/finance/quote` endpoint.
#[derive(Debug)]
pub struct YahooQuoteClient {
    config: QuoteConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct QuotePayload {
    #[serde(rename = "quoteResponse")]
    pub quote_response: QuoteResponseBody,
}

#[derive(Debug, Deserialize)]
pub struct QuoteResponseBody {
    #[serde(default)]
    pub result: Option<Vec<QuoteResult>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteResult {
    pub symbol: String,
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,
    #[serde(rename = "regularMarketPrice")]
    pub regular_market_price: Option<f64>,
}

impl YahooQuoteClient {
    pub fn new(config: QuoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteClient {
    async fn quote(&self, symbols: &[String]) -> Result<QuoteBatch> {
        let requested = normalize_symbols(symbols);
        if requested.is_empty() {
            return Ok(QuoteBatch::default());
        }

        let url = format!("{}/v7/finance/quote", self.config.api_base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbols", requested.join(","))])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "quote source returned failure status");
            return Err(QuoteError::Unavailable { status: status.as_u16() });
        }

        let payload: QuotePayload = response.json().await?;
        if let Some(error) = &payload.quote_response.error {
            return Err(QuoteError::BadPayload(error.to_string()));
        }

        let batch = batch_from_payload(&requested, payload);
        if !batch.failed.is_empty() {
            tracing::warn!(failed = ?batch.failed, "symbols missing from quote response");
        }
        Ok(batch)
    }
}

/// Uppercase, trim, and de-duplicate the request symbols, preserving order.
fn normalize_symbols(symbols: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    symbols
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Split a response payload into per-symbol quotes and failures. A symbol
/// absent from the response, or present without a positive price, is failed
/// rather than defaulted; callers must never see a zero price.
pub fn batch_from_payload(requested: &[String], payload: QuotePayload) -> QuoteBatch {
    let mut batch = QuoteBatch::default();

    for entry in payload.quote_response.result.unwrap_or_default() {
        let symbol = entry.symbol.trim().to_ascii_uppercase();
        if !requested.contains(&symbol) {
            continue;
        }
        let Some(price) = entry.regular_market_price.and_then(rounded_price) else {
            continue;
        };
        batch.quotes.insert(
            symbol.clone(),
            Quote { symbol, display_name: entry.short_name, price },
        );
    }

    for symbol in requested {
        if !batch.quotes.contains_key(symbol) {
            batch.failed.insert(symbol.clone());
        }
    }

    batch
}

/// Round a raw source price half-up to two decimals; non-finite and
/// non-positive prices are unusable.
fn rounded_price(raw: f64) -> Option<Decimal> {
    let price = Decimal::from_f64(raw)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (price > Decimal::ZERO).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> QuotePayload {
        serde_json::from_str(json).unwrap()
    }

    fn requested(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_batch_parses_and_rounds() {
        let payload = payload(
            r#"{"quoteResponse":{"result":[
                {"symbol":"AAPL","shortName":"Apple Inc.","regularMarketPrice":150.255},
                {"symbol":"MSFT","shortName":"Microsoft Corporation","regularMarketPrice":300.0}
            ],"error":null}}"#,
        );

        let batch = batch_from_payload(&requested(&["AAPL", "MSFT"]), payload);
        assert!(batch.failed.is_empty());
        assert_eq!(batch.get("AAPL").unwrap().price, dec("150.26"));
        assert_eq!(batch.get("MSFT").unwrap().price, dec("300"));
        assert_eq!(batch.get("AAPL").unwrap().display_name.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_missing_symbol_is_failed_not_zero() {
        let payload = payload(
            r#"{"quoteResponse":{"result":[
                {"symbol":"AAPL","shortName":"Apple Inc.","regularMarketPrice":150.25}
            ],"error":null}}"#,
        );

        let batch = batch_from_payload(&requested(&["AAPL", "ZZZZ"]), payload);
        assert!(batch.get("AAPL").is_some());
        assert!(batch.get("ZZZZ").is_none());
        assert!(batch.failed.contains("ZZZZ"));
    }

    #[test]
    fn test_null_or_nonpositive_price_is_failed() {
        let payload = payload(
            r#"{"quoteResponse":{"result":[
                {"symbol":"HALT","shortName":"Halted Co","regularMarketPrice":null},
                {"symbol":"ZERO","shortName":"Zero Co","regularMarketPrice":0.0},
                {"symbol":"NEG","shortName":"Negative Co","regularMarketPrice":-1.5}
            ],"error":null}}"#,
        );

        let batch = batch_from_payload(&requested(&["HALT", "ZERO", "NEG"]), payload);
        assert!(batch.quotes.is_empty());
        assert_eq!(batch.failed.len(), 3);
    }

    #[test]
    fn test_unsolicited_symbols_are_ignored() {
        let payload = payload(
            r#"{"quoteResponse":{"result":[
                {"symbol":"AAPL","shortName":"Apple Inc.","regularMarketPrice":150.25},
                {"symbol":"TSLA","shortName":"Tesla, Inc.","regularMarketPrice":200.0}
            ],"error":null}}"#,
        );

        let batch = batch_from_payload(&requested(&["AAPL"]), payload);
        assert!(batch.get("TSLA").is_none());
        assert!(batch.failed.is_empty());
    }

    #[test]
    fn test_normalize_symbols_dedupes() {
        let normalized = normalize_symbols(&requested(&[" aapl ", "AAPL", "msft", ""]));
        assert_eq!(normalized, vec!["AAPL".to_string(), "MSFT".to_string()]);
    }
}
