//! Memoization table behind the [`Stock`](crate::Stock) accessors.
//!
//! Derived tables are expensive to fetch and cheap to clone, so each handle
//! keeps a keyed map of everything it has computed. Entries never expire;
//! invalidation is explicit and per-key.

use std::collections::HashMap;
use std::future::Future;

use polars::prelude::DataFrame;
use serde_json::Value;
use stocks_core::{Result, SnapshotModule, StatementFrequency};
use tokio::sync::RwLock;
use tracing::debug;

/// Raw statement tables a [`MemoKey`] can address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum StatementKind {
    /// Income statement.
    Income,
    /// Cash flow statement.
    CashFlow,
    /// Balance sheet.
    BalanceSheet,
}

/// Key addressing one memoized table or record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum MemoKey {
    /// OHLCV price history under the current history parameters.
    PriceHistory,
    /// Per-share dividend payment history.
    DividendHistory,
    /// Dividend yield at each payment date.
    DividendYield,
    /// Period-over-period dividend growth.
    DividendGrowth,
    /// A raw statement at a reporting frequency.
    Statement(StatementKind, StatementFrequency),
    /// A trailing-twelve-month statement.
    TtmStatement(StatementKind),
    /// Combined fundamentals at a reporting frequency.
    Fundamentals(StatementFrequency),
    /// Trailing-twelve-month fundamentals.
    TtmFundamentals,
    /// Year-over-year growth of the annual fundamentals.
    Growth,
    /// Latest TTM growth snapshot.
    TtmGrowth,
    /// Valuation ratio table.
    Valuation,
    /// Latest valuation snapshot.
    TtmValuation,
    /// A scalar snapshot record.
    Snapshot(SnapshotModule),
}

/// Keyed memo store for DataFrames and scalar records.
#[derive(Debug, Default)]
pub(crate) struct MemoTable {
    frames: RwLock<HashMap<MemoKey, DataFrame>>,
    records: RwLock<HashMap<MemoKey, Value>>,
}

impl MemoTable {
    /// Returns the memoized frame for `key`, computing and storing it on
    /// first access.
    pub(crate) async fn frame<F, Fut>(&self, key: MemoKey, init: F) -> Result<DataFrame>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DataFrame>> + Send,
    {
        if let Some(df) = self.frames.read().await.get(&key) {
            debug!(?key, "memo hit");
            return Ok(df.clone());
        }
        debug!(?key, "memo miss");
        let df = init().await?;
        self.frames.write().await.insert(key, df.clone());
        Ok(df)
    }

    /// Returns the memoized record for `key`, computing and storing it on
    /// first access.
    pub(crate) async fn record<F, Fut>(&self, key: MemoKey, init: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send,
    {
        if let Some(value) = self.records.read().await.get(&key) {
            debug!(?key, "memo hit");
            return Ok(value.clone());
        }
        debug!(?key, "memo miss");
        let value = init().await?;
        self.records.write().await.insert(key, value.clone());
        Ok(value)
    }

    /// Drops the entry for `key`, if any.
    pub(crate) async fn invalidate(&self, key: MemoKey) {
        if self.frames.write().await.remove(&key).is_some()
            || self.records.write().await.remove(&key).is_some()
        {
            debug!(?key, "memo invalidated");
        }
    }
}
