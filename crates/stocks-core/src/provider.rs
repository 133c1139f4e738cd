//! Provider trait for the raw data retrieval layer.
//!
//! The derivation core never talks to the network itself; it consumes tables
//! produced by a [`StatementProvider`]. Statement tables come back with the
//! vendor's CamelCase field names plus a [`DATE_COL`](crate::frame::DATE_COL)
//! column of dtype `Date`, sorted ascending. The valuation table keeps the
//! raw vendor shape (`asOfDate`, `periodType`, ratio fields); the valuation
//! builder does the normalization.

use std::fmt::Debug;

use async_trait::async_trait;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::DATE_COL;
use crate::frequency::StatementFrequency;
use crate::types::{HistoryQuery, Symbol};

/// Scalar snapshot record groups a provider can return unmodified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotModule {
    /// Key statistics (shares outstanding, float, etc.).
    KeyStats,
    /// Summary detail (day range, volume, yield, etc.).
    SummaryDetail,
    /// Real-time price block.
    Price,
    /// Financial data block (targets, recommendations, margins).
    FinancialData,
}

impl SnapshotModule {
    /// Returns the vendor module name for this snapshot.
    #[must_use]
    pub const fn module_name(&self) -> &'static str {
        match self {
            Self::KeyStats => "defaultKeyStatistics",
            Self::SummaryDetail => "summaryDetail",
            Self::Price => "price",
            Self::FinancialData => "financialData",
        }
    }
}

/// Retrieval layer for a single market data vendor.
///
/// Every method fetches raw, vendor-shaped data for one symbol. The metric
/// builders in `stocks-metrics` consume these tables as opaque inputs; all
/// normalization happens downstream.
#[async_trait]
pub trait StatementProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g. "Yahoo Finance").
    fn name(&self) -> &str;

    /// Fetches the income statement.
    ///
    /// When `trailing` is true the table holds trailing-twelve-month
    /// aggregated rows instead of discrete periods.
    async fn income_statement(
        &self,
        symbol: &Symbol,
        frequency: StatementFrequency,
        trailing: bool,
    ) -> Result<DataFrame>;

    /// Fetches the cash flow statement.
    async fn cash_flow(
        &self,
        symbol: &Symbol,
        frequency: StatementFrequency,
        trailing: bool,
    ) -> Result<DataFrame>;

    /// Fetches the balance sheet. Balance sheets have no trailing variant;
    /// a point-in-time statement is already a snapshot.
    async fn balance_sheet(
        &self,
        symbol: &Symbol,
        frequency: StatementFrequency,
    ) -> Result<DataFrame>;

    /// Fetches raw valuation measures (`asOfDate`, `periodType` and vendor
    /// ratio fields).
    async fn valuation_measures(&self, symbol: &Symbol) -> Result<DataFrame>;

    /// Fetches OHLCV price history with a `dividends` column that is `0.0`
    /// on non-payment dates.
    async fn price_history(&self, symbol: &Symbol, query: &HistoryQuery) -> Result<DataFrame>;

    /// Fetches historical dividends per share as a `Date`/`Dividend` table.
    ///
    /// The default implementation filters payment dates out of a five-year
    /// daily price history. Providers with a dedicated dividend endpoint can
    /// override it.
    async fn dividends(&self, symbol: &Symbol) -> Result<DataFrame> {
        let history = self.price_history(symbol, &HistoryQuery::default()).await?;
        let out = history
            .lazy()
            .filter(col("dividends").gt(0.0))
            .select([col(DATE_COL), col("dividends").alias("Dividend")])
            .collect()?;
        Ok(out)
    }

    /// Fetches a scalar snapshot record, passed through unmodified.
    async fn snapshot(&self, symbol: &Symbol, module: SnapshotModule)
    -> Result<serde_json::Value>;
}
