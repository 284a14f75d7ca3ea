//! Account and portfolio records

use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Name of the distinguished aggregation portfolio every account owns.
pub const ALL_PORTFOLIO: &str = "All";

/// Names that can never be taken by a user-created portfolio. "All" is the
/// reserved aggregation bucket; "CreateNew" is claimed by the portfolio
/// picker in the UI layer.
pub const RESERVED_PORTFOLIO_NAMES: &[&str] = &[ALL_PORTFOLIO, "CreateNew"];

/// Maximum accepted portfolio name length after formatting.
pub const MAX_PORTFOLIO_NAME_LEN: usize = 25;

/// Account represents one user's cash holdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub balance: Money,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Portfolio is a named grouping of positions owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Portfolio {
    /// Whether this is the reserved "All" aggregation portfolio.
    pub fn is_all(&self) -> bool {
        self.name.eq_ignore_ascii_case(ALL_PORTFOLIO)
    }
}

/// Format a raw portfolio name the way the directory stores it: trimmed,
/// lowercased, then the first letter of each word capitalized.
pub fn format_portfolio_name(raw: &str) -> String {
    let mut formatted = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for c in raw.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            formatted.push(c);
            at_word_start = true;
        } else if at_word_start {
            formatted.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            formatted.push(c);
        }
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_portfolio_name() {
        assert_eq!(format_portfolio_name("  tech stocks "), "Tech Stocks");
        assert_eq!(format_portfolio_name("RETIREMENT"), "Retirement");
        assert_eq!(format_portfolio_name("my 2nd fund"), "My 2nd Fund");
    }

    #[test]
    fn test_is_all() {
        let portfolio = Portfolio {
            id: 1,
            user_id: "u1".to_string(),
            name: "All".to_string(),
            created_at: chrono::Utc::now(),
        };
        assert!(portfolio.is_all());
    }
}
