//! Per-symbol pipeline handle.

use std::sync::Arc;

use polars::prelude::DataFrame;
use serde_json::Value;
use stocks_core::frame::{drop_null_rows, latest_row};
use stocks_core::{
    HistoryQuery, HistoryUpdate, Result, SnapshotModule, StatementFrequency, StatementProvider,
    StocksError, Symbol,
};
use stocks_metrics::{
    build_fundamentals, build_valuation, compute_growth, dividend_growth, dividend_yield_history,
};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::memo::{MemoKey, MemoTable, StatementKind};

/// Quarters in the year-over-year lag of the TTM growth snapshot.
const TTM_LAG_QUARTERS: i64 = 4;

/// One symbol bound to one provider, with lazy memoized accessors.
///
/// Every accessor fetches and derives its table at most once per handle;
/// repeated calls return a clone of the memoized frame. The handle is cheap
/// to share across tasks.
///
/// # Example
///
/// ```rust,ignore
/// use stocks::{StatementFrequency, Stock};
///
/// #[tokio::main]
/// async fn main() -> stocks::Result<()> {
///     let stock = Stock::yahoo("AAPL");
///
///     let fundamentals = stock.fundamentals(StatementFrequency::Annual).await?;
///     let growth = stock.growth().await?;
///     println!("{fundamentals}\n{growth}");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Stock {
    symbol: Symbol,
    provider: Arc<dyn StatementProvider>,
    history_query: RwLock<HistoryQuery>,
    memo: MemoTable,
}

impl Stock {
    /// Creates a handle for `symbol` backed by `provider`.
    pub fn new(symbol: impl Into<Symbol>, provider: Arc<dyn StatementProvider>) -> Self {
        Self {
            symbol: symbol.into(),
            provider,
            history_query: RwLock::new(HistoryQuery::default()),
            memo: MemoTable::default(),
        }
    }

    /// Creates a handle backed by Yahoo Finance with default rate limiting.
    #[cfg(feature = "yahoo")]
    pub fn yahoo(symbol: impl Into<Symbol>) -> Self {
        Self::new(symbol, Arc::new(stocks_yahoo::YahooProvider::new()))
    }

    /// The symbol this handle is bound to.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// The name of the backing provider.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The current price history parameters.
    pub async fn history_query(&self) -> HistoryQuery {
        self.history_query.read().await.clone()
    }

    /// Applies a partial update to the history parameters and drops the
    /// memoized price history so the next access refetches.
    ///
    /// Tables already derived from the old history (dividend series) keep
    /// their memos; dividends are a property of the payment record, not of
    /// the lookback window.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn refresh_history(&self, update: &HistoryUpdate) {
        self.history_query.write().await.apply(update);
        self.memo.invalidate(MemoKey::PriceHistory).await;
    }

    /// OHLCV price history under the current history parameters.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn price_history(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::PriceHistory, || async move {
                let query = self.history_query.read().await.clone();
                self.provider.price_history(&self.symbol, &query).await
            })
            .await
    }

    /// Historical dividends per share as a `Date`/`Dividend` table.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn dividend_history(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::DividendHistory, || async move {
                self.provider.dividends(&self.symbol).await
            })
            .await
    }

    /// Dividend yield at each payment date, in percent.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn dividend_yield(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::DividendYield, || async move {
                let history = self.price_history().await?;
                dividend_yield_history(&history)
            })
            .await
    }

    /// Period-over-period growth in dividend payments, increases only.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn dividend_growth(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::DividendGrowth, || async move {
                let history = self.dividend_history().await?;
                dividend_growth(&history)
            })
            .await
    }

    /// Raw income statement at the given reporting frequency.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn income_statement(&self, frequency: StatementFrequency) -> Result<DataFrame> {
        self.memo
            .frame(
                MemoKey::Statement(StatementKind::Income, frequency),
                || async move {
                    self.provider
                        .income_statement(&self.symbol, frequency, false)
                        .await
                },
            )
            .await
    }

    /// Raw cash flow statement at the given reporting frequency.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn cash_flow(&self, frequency: StatementFrequency) -> Result<DataFrame> {
        self.memo
            .frame(
                MemoKey::Statement(StatementKind::CashFlow, frequency),
                || async move { self.provider.cash_flow(&self.symbol, frequency, false).await },
            )
            .await
    }

    /// Raw balance sheet at the given reporting frequency.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn balance_sheet(&self, frequency: StatementFrequency) -> Result<DataFrame> {
        self.memo
            .frame(
                MemoKey::Statement(StatementKind::BalanceSheet, frequency),
                || async move { self.provider.balance_sheet(&self.symbol, frequency).await },
            )
            .await
    }

    /// Trailing-twelve-month income statement.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn ttm_income_statement(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::TtmStatement(StatementKind::Income), || async move {
                self.provider
                    .income_statement(&self.symbol, StatementFrequency::Quarterly, true)
                    .await
            })
            .await
    }

    /// Trailing-twelve-month cash flow statement.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn ttm_cash_flow(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::TtmStatement(StatementKind::CashFlow), || async move {
                self.provider
                    .cash_flow(&self.symbol, StatementFrequency::Quarterly, true)
                    .await
            })
            .await
    }

    /// Combined fundamentals table at the given reporting frequency.
    ///
    /// Inner-joins the three statement extracts on their reporting dates,
    /// so only fully covered periods appear.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn fundamentals(&self, frequency: StatementFrequency) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::Fundamentals(frequency), || async move {
                let income = self.income_statement(frequency).await?;
                let cashflow = self.cash_flow(frequency).await?;
                let balance = self.balance_sheet(frequency).await?;
                let combined = build_fundamentals(&income, &cashflow, &balance)?;
                drop_null_rows(&combined)
            })
            .await
    }

    /// Trailing-twelve-month balance sheet: the latest quarterly row.
    ///
    /// A balance sheet is already a point-in-time snapshot, so the TTM view
    /// is the most recent quarter rather than a trailing aggregate.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn ttm_balance_sheet(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::TtmStatement(StatementKind::BalanceSheet), || async move {
                let quarterly = self.balance_sheet(StatementFrequency::Quarterly).await?;
                self.latest_or_unavailable(&quarterly)
            })
            .await
    }

    /// Trailing-twelve-month fundamentals, built from the three TTM
    /// single-row statements.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn ttm_fundamentals(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::TtmFundamentals, || async move {
                let income = self.ttm_income_statement().await?;
                let cashflow = self.ttm_cash_flow().await?;
                let balance = self.ttm_balance_sheet().await?;
                let combined = build_fundamentals(&income, &cashflow, &balance)?;
                drop_null_rows(&combined)
            })
            .await
    }

    /// Year-over-year growth of the annual fundamentals.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn growth(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::Growth, || async move {
                let fundamentals = self.fundamentals(StatementFrequency::Annual).await?;
                compute_growth(&fundamentals, 1)
            })
            .await
    }

    /// Latest TTM growth snapshot: quarterly fundamentals lagged four
    /// quarters, last row only.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn ttm_growth(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::TtmGrowth, || async move {
                let fundamentals = self.fundamentals(StatementFrequency::Quarterly).await?;
                let growth = compute_growth(&fundamentals, TTM_LAG_QUARTERS)?;
                self.latest_or_unavailable(&growth)
            })
            .await
    }

    /// Valuation ratio table, ascending by date.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn valuation(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::Valuation, || async move {
                let raw = self.provider.valuation_measures(&self.symbol).await?;
                build_valuation(&raw)
            })
            .await
    }

    /// Latest row of the valuation table.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn ttm_valuation(&self) -> Result<DataFrame> {
        self.memo
            .frame(MemoKey::TtmValuation, || async move {
                let valuation = self.valuation().await?;
                self.latest_or_unavailable(&valuation)
            })
            .await
    }

    /// Scalar snapshot record, passed through from the provider.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn snapshot(&self, module: SnapshotModule) -> Result<Value> {
        self.memo
            .record(MemoKey::Snapshot(module), || async move {
                self.provider.snapshot(&self.symbol, module).await
            })
            .await
    }

    fn latest_or_unavailable(&self, df: &DataFrame) -> Result<DataFrame> {
        latest_row(df).ok_or_else(|| StocksError::DataNotAvailable {
            symbol: self.symbol.to_string(),
            start: "N/A".to_string(),
            end: "N/A".to_string(),
        })
    }
}
