//! Fixed-point money type for ledger arithmetic

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Money represents a monetary amount in whole cents.
///
/// All balance and price arithmetic happens on the cent grid; decimals only
/// appear at the quote boundary, where prices are rounded half-up to two
/// places before they become `Money`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    /// Create a money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Get the value in cents.
    pub const fn cents(self) -> i64 {
        self.cents
    }

    /// Get the value as a decimal in dollars.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    /// Convert a decimal dollar amount to cents, rounding half-up to two
    /// places first. Returns `None` when the amount does not fit in `i64`
    /// cents.
    pub fn try_from_decimal(decimal: Decimal) -> Option<Self> {
        let rounded = decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let cents = (rounded * Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()?;
        Some(Self { cents })
    }

    pub fn is_zero(self) -> bool {
        self.cents == 0
    }

    pub fn is_positive(self) -> bool {
        self.cents > 0
    }

    /// Multiply a per-share price by a share count, exactly.
    pub fn checked_mul(self, shares: u32) -> Option<Self> {
        self.cents.checked_mul(i64::from(shares)).map(Self::from_cents)
    }

    /// Multiply a per-share price by a share count, clamping on overflow.
    /// Used for affordability guards where the clamped value still compares
    /// correctly against any real balance.
    pub fn saturating_mul(self, shares: u32) -> Self {
        Self::from_cents(self.cents.saturating_mul(i64::from(shares)))
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.cents.checked_add(other.cents).map(Self::from_cents)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self::from_cents(self.cents.saturating_add(other.cents))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { cents: self.cents + other.cents }
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self { cents: self.cents - other.cents }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_cents_round_trip() {
        let m = Money::from_cents(150_25);
        assert_eq!(m.cents(), 15025);
        assert_eq!(m.to_decimal(), dec("150.25"));
    }

    #[test]
    fn test_from_decimal_rounds_half_up() {
        assert_eq!(Money::try_from_decimal(dec("150.255")), Some(Money::from_cents(15026)));
        assert_eq!(Money::try_from_decimal(dec("150.254")), Some(Money::from_cents(15025)));
        assert_eq!(Money::try_from_decimal(dec("0.005")), Some(Money::from_cents(1)));
    }

    #[test]
    fn test_checked_mul_exact_totals() {
        // 10 shares at $150.25 is exactly $1,502.50.
        let price = Money::from_cents(15025);
        assert_eq!(price.checked_mul(10), Some(Money::from_cents(150_250)));
        assert_eq!(Money::from_cents(i64::MAX).checked_mul(2), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(150250).to_string(), "$1502.50");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-15025).to_string(), "-$150.25");
    }
}
