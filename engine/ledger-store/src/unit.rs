//! Atomic unit of ledger mutations.
//!
//! A [`LedgerUnit`] wraps one database transaction: balance adjustments,
//! position upserts, and log appends issued through it become visible
//! together on [`LedgerUnit::commit`] or not at all. Dropping an uncommitted
//! unit rolls everything back.
//!
//! Every mutation is a guarded read-modify-write statement, so a unit that
//! lost a race against a concurrent trade fails its guard here instead of
//! overwriting the other writer's effects.

use crate::money::Money;
use crate::store::shares_from_stored;
use crate::symbol::{Symbol, TradeSide};
use crate::transaction::TransactionRecord;
use crate::{Result, StoreError};
use chrono::Utc;
use sqlx::{Sqlite, Transaction};

pub struct LedgerUnit {
    tx: Transaction<'static, Sqlite>,
}

impl LedgerUnit {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    /// Apply a signed delta (in cents) to a user's cash balance.
    ///
    /// Pure arithmetic guard: fails with `InsufficientFunds` when the result
    /// would go negative and `LimitExceeded` when it would pass
    /// `max_balance`. Returns the new balance.
    pub async fn adjust_balance(
        &mut self,
        user_id: &str,
        delta_cents: i64,
        max_balance: Money,
    ) -> Result<Money> {
        let updated: Option<(i64,)> = sqlx::query_as(
            "UPDATE accounts SET balance = balance + ?1 \
             WHERE user_id = ?2 AND balance + ?1 BETWEEN 0 AND ?3 \
             RETURNING balance",
        )
        .bind(delta_cents)
        .bind(user_id)
        .bind(max_balance.cents())
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some((balance,)) = updated {
            tracing::debug!(user_id, delta_cents, balance, "balance adjusted");
            return Ok(Money::from_cents(balance));
        }

        // Guard refused; re-read inside the same transaction to say why.
        let current: Option<(i64,)> =
            sqlx::query_as("SELECT balance FROM accounts WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        match current {
            None => Err(StoreError::AccountNotFound(user_id.to_string())),
            Some((balance,)) if balance + delta_cents < 0 => Err(StoreError::InsufficientFunds {
                required: Money::from_cents(-delta_cents),
                available: Money::from_cents(balance),
            }),
            Some(_) => Err(StoreError::LimitExceeded { limit: max_balance }),
        }
    }

    /// Apply a signed share delta to a (portfolio, symbol) position.
    ///
    /// Creates the row on first buy, updates it in place, and deletes it
    /// when the count reaches exactly zero. A delta that would take the
    /// count negative fails with `Conflict`: the ownership guard ran before
    /// the unit started, so reaching here means a concurrent trade drained
    /// the position. Returns the new share count.
    pub async fn upsert_position(
        &mut self,
        portfolio_id: i64,
        symbol: &Symbol,
        delta_shares: i64,
    ) -> Result<u32> {
        if delta_shares == 0 {
            let current: Option<(i64,)> = sqlx::query_as(
                "SELECT shares FROM positions WHERE portfolio_id = ? AND symbol = ?",
            )
            .bind(portfolio_id)
            .bind(symbol.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
            return match current {
                Some((shares,)) => shares_from_stored(shares),
                None => Ok(0),
            };
        }

        let updated: Option<(i64,)> = if delta_shares > 0 {
            sqlx::query_as(
                "INSERT INTO positions (portfolio_id, symbol, shares, last_updated) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (portfolio_id, symbol) \
                 DO UPDATE SET shares = shares + excluded.shares, last_updated = excluded.last_updated \
                 RETURNING shares",
            )
            .bind(portfolio_id)
            .bind(symbol.as_str())
            .bind(delta_shares)
            .bind(Utc::now())
            .fetch_optional(&mut *self.tx)
            .await?
        } else {
            // Draining the whole position is a straight delete: the stored
            // shares > 0 constraint forbids writing an intermediate zero.
            let drained = sqlx::query(
                "DELETE FROM positions WHERE portfolio_id = ?1 AND symbol = ?2 AND shares = ?3",
            )
            .bind(portfolio_id)
            .bind(symbol.as_str())
            .bind(-delta_shares)
            .execute(&mut *self.tx)
            .await?;
            if drained.rows_affected() == 1 {
                tracing::debug!(portfolio_id, symbol = %symbol, "position closed");
                return Ok(0);
            }

            sqlx::query_as(
                "UPDATE positions SET shares = shares + ?3, last_updated = ?4 \
                 WHERE portfolio_id = ?1 AND symbol = ?2 AND shares + ?3 > 0 \
                 RETURNING shares",
            )
            .bind(portfolio_id)
            .bind(symbol.as_str())
            .bind(delta_shares)
            .bind(Utc::now())
            .fetch_optional(&mut *self.tx)
            .await?
        };

        let Some((shares,)) = updated else {
            return Err(StoreError::Conflict);
        };

        // Post-condition for the "row exists iff shares > 0" invariant: the
        // guarded statements above can only leave a strictly positive count.
        if shares <= 0 {
            tracing::error!(portfolio_id, symbol = %symbol, shares, "position invariant violated");
            return Err(StoreError::Integrity(format!(
                "position ({portfolio_id}, {symbol}) left at {shares}"
            )));
        }

        tracing::debug!(portfolio_id, symbol = %symbol, shares, "position updated");
        shares_from_stored(shares)
    }

    /// Append one executed trade to the log. Insert-only; returns the record
    /// with its assigned id and timestamp.
    pub async fn append_transaction(
        &mut self,
        portfolio_id: i64,
        symbol: &Symbol,
        side: TradeSide,
        shares: u32,
        price: Money,
    ) -> Result<TransactionRecord> {
        let occurred_at = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO transactions (portfolio_id, symbol, side, shares, price, occurred_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(portfolio_id)
        .bind(symbol.as_str())
        .bind(side.as_str())
        .bind(shares)
        .bind(price.cents())
        .bind(occurred_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(TransactionRecord {
            id,
            portfolio_id,
            symbol: symbol.clone(),
            side,
            shares,
            price,
            occurred_at,
        })
    }

    /// Make every mutation in this unit durable.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
