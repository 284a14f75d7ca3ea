//! LedgerStore implementation: pool ownership, account/portfolio directory,
//! and the read paths over positions and the trade log.

use crate::account::{
    format_portfolio_name, Account, Portfolio, ALL_PORTFOLIO, MAX_PORTFOLIO_NAME_LEN,
    RESERVED_PORTFOLIO_NAMES,
};
use crate::config::StoreConfig;
use crate::error::is_unique_violation;
use crate::money::Money;
use crate::position::{Position, WatchEntry};
use crate::symbol::{Symbol, TradeSide};
use crate::transaction::{TransactionFilter, TransactionRecord};
use crate::unit::LedgerUnit;
use crate::{Result, StoreError};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Default page size for transaction log reads.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// LedgerStore owns the connection pool and exposes the directory and read
/// paths directly; all balance/position/log mutations go through a
/// [`LedgerUnit`] obtained from [`LedgerStore::begin`].
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct PortfolioRow {
    id: i64,
    user_id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<PortfolioRow> for Portfolio {
    fn from(row: PortfolioRow) -> Self {
        Portfolio { id: row.id, user_id: row.user_id, name: row.name, created_at: row.created_at }
    }
}

#[derive(sqlx::FromRow)]
struct PositionRow {
    portfolio_id: i64,
    symbol: String,
    shares: i64,
    last_updated: DateTime<Utc>,
}

impl TryFrom<PositionRow> for Position {
    type Error = StoreError;

    fn try_from(row: PositionRow) -> Result<Self> {
        Ok(Position {
            portfolio_id: row.portfolio_id,
            symbol: Symbol::from_stored(row.symbol)?,
            shares: shares_from_stored(row.shares)?,
            last_updated: row.last_updated,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    portfolio_id: i64,
    symbol: String,
    side: String,
    shares: i64,
    price: i64,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(TransactionRecord {
            id: row.id,
            portfolio_id: row.portfolio_id,
            symbol: Symbol::from_stored(row.symbol)?,
            side: TradeSide::from_stored(&row.side)?,
            shares: shares_from_stored(row.shares)?,
            price: Money::from_cents(row.price),
            occurred_at: row.occurred_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WatchRow {
    portfolio_id: i64,
    symbol: String,
    added_at: DateTime<Utc>,
}

/// Stored share counts are guarded to stay strictly positive; anything else
/// coming back out of the table is corruption, not a caller error.
pub(crate) fn shares_from_stored(stored: i64) -> Result<u32> {
    u32::try_from(stored)
        .map_err(|_| StoreError::Integrity(format!("stored share count {stored} out of range")))
}

impl LedgerStore {
    /// Open the database, apply pragmas, and run migrations.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .foreign_keys(true);
        if !config.url.contains(":memory:") {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Self::connect_with(pool).await
    }

    /// Wrap an already-configured pool, running migrations first.
    pub async fn connect_with(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Start an atomic unit. Everything done through the returned
    /// [`LedgerUnit`] commits together or not at all.
    pub async fn begin(&self) -> Result<LedgerUnit> {
        Ok(LedgerUnit::new(self.pool.begin().await?))
    }

    /// Create an account with its opening balance and the reserved "All"
    /// portfolio, atomically.
    pub async fn open_account(&self, user_id: &str, opening_balance: Money) -> Result<Account> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO accounts (user_id, balance, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(opening_balance.cents())
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::AccountExists(user_id.to_string())
                } else {
                    e.into()
                }
            })?;

        sqlx::query("INSERT INTO portfolios (user_id, name, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(ALL_PORTFOLIO)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id, balance = %opening_balance, "account opened");

        Ok(Account { user_id: user_id.to_string(), balance: opening_balance, created_at })
    }

    /// Current cash balance for a user.
    pub async fn get_balance(&self, user_id: &str) -> Result<Money> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT balance FROM accounts WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(cents,)| Money::from_cents(cents))
            .ok_or_else(|| StoreError::AccountNotFound(user_id.to_string()))
    }

    /// Resolve a portfolio id under an owning user. An id that exists but
    /// belongs to someone else is reported as not found.
    pub async fn find_portfolio(&self, user_id: &str, portfolio_id: i64) -> Result<Portfolio> {
        sqlx::query_as::<_, PortfolioRow>(
            "SELECT id, user_id, name, created_at FROM portfolios WHERE id = ? AND user_id = ?",
        )
        .bind(portfolio_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Portfolio::from)
        .ok_or(StoreError::PortfolioNotFound { portfolio_id })
    }

    /// Name-based resolution for the directory surface. Case-insensitive,
    /// matching the stored collation.
    pub async fn find_portfolio_by_name(&self, user_id: &str, name: &str) -> Result<Portfolio> {
        sqlx::query_as::<_, PortfolioRow>(
            "SELECT id, user_id, name, created_at FROM portfolios WHERE user_id = ? AND name = ?",
        )
        .bind(user_id)
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?
        .map(Portfolio::from)
        .ok_or(StoreError::PortfolioNotFound { portfolio_id: 0 })
    }

    pub async fn portfolios_for_user(&self, user_id: &str) -> Result<Vec<Portfolio>> {
        let rows = sqlx::query_as::<_, PortfolioRow>(
            "SELECT id, user_id, name, created_at FROM portfolios WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Portfolio::from).collect())
    }

    /// Create a user-named portfolio. The name is formatted the way the
    /// directory displays it, reserved names are rejected, and uniqueness is
    /// enforced per user, case-insensitively, by the stored constraint.
    pub async fn create_portfolio(&self, user_id: &str, name: &str) -> Result<Portfolio> {
        let formatted = format_portfolio_name(name);
        if formatted.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if formatted.len() > MAX_PORTFOLIO_NAME_LEN {
            return Err(StoreError::NameTooLong { name: formatted, max: MAX_PORTFOLIO_NAME_LEN });
        }
        if RESERVED_PORTFOLIO_NAMES.iter().any(|r| r.eq_ignore_ascii_case(&formatted)) {
            return Err(StoreError::ReservedName { name: formatted });
        }

        // Surfaces a missing account as AccountNotFound instead of a bare
        // foreign key failure.
        self.get_balance(user_id).await?;

        let created_at = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO portfolios (user_id, name, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(user_id)
        .bind(&formatted)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateName { name: formatted.clone() }
            } else {
                e.into()
            }
        })?;

        tracing::info!(user_id, portfolio = %formatted, "portfolio created");
        Ok(Portfolio { id, user_id: user_id.to_string(), name: formatted, created_at })
    }

    /// Held share count for one (portfolio, symbol) pair; 0 when no row.
    pub async fn get_position(&self, portfolio_id: i64, symbol: &Symbol) -> Result<u32> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT shares FROM positions WHERE portfolio_id = ? AND symbol = ?")
                .bind(portfolio_id)
                .bind(symbol.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((shares,)) => shares_from_stored(shares),
            None => Ok(0),
        }
    }

    /// All positions across a set of portfolios, read in one statement so the
    /// result is a single consistency snapshot.
    pub async fn positions_for_portfolios(&self, portfolio_ids: &[i64]) -> Result<Vec<Position>> {
        if portfolio_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; portfolio_ids.len()].join(", ");
        let sql = format!(
            "SELECT portfolio_id, symbol, shares, last_updated FROM positions \
             WHERE portfolio_id IN ({placeholders}) ORDER BY symbol, portfolio_id"
        );

        let mut query = sqlx::query_as::<_, PositionRow>(&sql);
        for id in portfolio_ids {
            query = query.bind(*id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Position::try_from).collect()
    }

    /// Filtered, paginated read of the trade log, joined to portfolio
    /// ownership. Newest first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>> {
        let mut sql = String::from(
            "SELECT t.id, t.portfolio_id, t.symbol, t.side, t.shares, t.price, t.occurred_at \
             FROM transactions t JOIN portfolios p ON p.id = t.portfolio_id \
             WHERE p.user_id = ?",
        );
        if filter.portfolio.is_some() {
            sql.push_str(" AND t.portfolio_id = ?");
        }
        if filter.symbol.is_some() {
            sql.push_str(" AND t.symbol = ?");
        }
        if filter.side.is_some() {
            sql.push_str(" AND t.side = ?");
        }
        if filter.from.is_some() {
            sql.push_str(" AND t.occurred_at >= ?");
        }
        if filter.to.is_some() {
            sql.push_str(" AND t.occurred_at <= ?");
        }
        sql.push_str(" ORDER BY t.occurred_at DESC, t.id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, TransactionRow>(&sql).bind(user_id);
        if let Some(portfolio_id) = filter.portfolio {
            query = query.bind(portfolio_id);
        }
        if let Some(symbol) = &filter.symbol {
            query = query.bind(symbol.as_str());
        }
        if let Some(side) = filter.side {
            query = query.bind(side.as_str());
        }
        if let Some(from) = filter.from {
            query = query.bind(from);
        }
        if let Some(to) = filter.to {
            query = query.bind(to);
        }
        query = query
            .bind(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE))
            .bind(filter.offset.unwrap_or(0));

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(TransactionRecord::try_from).collect()
    }

    /// Pin a symbol to a portfolio's watchlist. Idempotent.
    pub async fn add_watch(&self, portfolio_id: i64, symbol: &Symbol) -> Result<()> {
        sqlx::query(
            "INSERT INTO watchlist (portfolio_id, symbol, added_at) VALUES (?, ?, ?) \
             ON CONFLICT (portfolio_id, symbol) DO NOTHING",
        )
        .bind(portfolio_id)
        .bind(symbol.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a watchlist entry; returns whether one existed.
    pub async fn remove_watch(&self, portfolio_id: i64, symbol: &Symbol) -> Result<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE portfolio_id = ? AND symbol = ?")
            .bind(portfolio_id)
            .bind(symbol.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn watched_entries(&self, portfolio_ids: &[i64]) -> Result<Vec<WatchEntry>> {
        if portfolio_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; portfolio_ids.len()].join(", ");
        let sql = format!(
            "SELECT portfolio_id, symbol, added_at FROM watchlist \
             WHERE portfolio_id IN ({placeholders}) ORDER BY symbol, portfolio_id"
        );

        let mut query = sqlx::query_as::<_, WatchRow>(&sql);
        for id in portfolio_ids {
            query = query.bind(*id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                Ok(WatchEntry {
                    portfolio_id: row.portfolio_id,
                    symbol: Symbol::from_stored(row.symbol)?,
                    added_at: row.added_at,
                })
            })
            .collect()
    }
}
