//! Transaction history query: filtered reads of the trade log with
//! best-effort display names.

use crate::engine::TradeEngine;
use crate::error::Result;
use ledger_store::{Money, TransactionFilter, TransactionRecord};
use serde::{Deserialize, Serialize};

/// One trade log record, decorated with a display name when the quote
/// source can provide one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: TransactionRecord,
    pub display_name: Option<String>,
}

impl HistoryEntry {
    /// Total traded value, recomputed from the record's factors.
    pub fn total(&self) -> Money {
        self.record.total()
    }
}

impl TradeEngine {
    /// Read the user's trade log, newest first, applying the filter's
    /// portfolio/symbol/side/date-range bounds and pagination. Display names
    /// are resolved with one batched quote call; if the quote source is down
    /// the entries come back symbol-only rather than failing the query.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<HistoryEntry>> {
        let records = self.store().list_transactions(user_id, filter).await?;

        let mut symbols: Vec<String> =
            records.iter().map(|r| r.symbol.as_str().to_string()).collect();
        symbols.sort();
        symbols.dedup();
        let batch = self.quote_or_empty(&symbols).await;

        Ok(records
            .into_iter()
            .map(|record| {
                let display_name =
                    batch.get(record.symbol.as_str()).and_then(|q| q.display_name.clone());
                HistoryEntry { record, display_name }
            })
            .collect())
    }
}
