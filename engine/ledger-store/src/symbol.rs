//! Stock symbol normalization and trade side

use crate::error::StoreError;
use serde::{Deserialize, Serialize};

/// Maximum accepted symbol length after normalization.
pub const MAX_SYMBOL_LEN: usize = 10;

/// A normalized stock symbol: trimmed, uppercased, 1..=10 characters from
/// `[A-Z0-9.-]`. `Symbol::parse` is the only constructor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Normalize and validate a raw symbol string.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let normalized = raw.trim().to_ascii_uppercase();

        let valid = !normalized.is_empty()
            && normalized.len() <= MAX_SYMBOL_LEN
            && normalized.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-');

        if valid {
            Ok(Self(normalized))
        } else {
            Err(StoreError::InvalidSymbol { given: raw.to_string() })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rehydrate a symbol read back from the ledger. Stored symbols were
    /// normalized on the way in; anything else is corrupted state.
    pub(crate) fn from_stored(stored: String) -> Result<Self, StoreError> {
        match Self::parse(&stored) {
            Ok(symbol) if symbol.0 == stored => Ok(symbol),
            _ => Err(StoreError::Integrity(format!("malformed stored symbol {stored:?}"))),
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trade side enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Stable string form used in the transactions table.
    pub fn as_str(self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    pub(crate) fn from_stored(stored: &str) -> Result<Self, StoreError> {
        match stored {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            other => Err(StoreError::Integrity(format!("unknown trade side {other:?}"))),
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let symbol = Symbol::parse("  aapl ").unwrap();
        assert_eq!(symbol.as_str(), "AAPL");
    }

    #[test]
    fn test_parse_accepts_class_shares() {
        assert!(Symbol::parse("BRK.B").is_ok());
        assert!(Symbol::parse("BF-B").is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Symbol::parse("").is_err());
        assert!(Symbol::parse("   ").is_err());
        assert!(Symbol::parse("TOOLONGSYMBOL").is_err());
        assert!(Symbol::parse("AA PL").is_err());
        assert!(Symbol::parse("aapl$").is_err());
    }

    #[test]
    fn test_side_round_trip() {
        assert_eq!(TradeSide::from_stored("BUY").unwrap(), TradeSide::Buy);
        assert_eq!(TradeSide::from_stored("SELL").unwrap(), TradeSide::Sell);
        assert!(TradeSide::from_stored("HOLD").is_err());
    }
}
