#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stocks/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! This crate implements the [`StatementProvider`] trait from `stocks-core`
//! against Yahoo Finance's public endpoints.
//!
//! # Example
//!
//! ```no_run
//! use stocks_yahoo::YahooProvider;
//! use stocks_core::{HistoryQuery, StatementProvider, Symbol};
//!
//! # async fn example() -> stocks_core::Result<()> {
//! let provider = YahooProvider::new();
//! let symbol = Symbol::new("AAPL");
//!
//! let history = provider.price_history(&symbol, &HistoryQuery::default()).await?;
//! println!("Fetched {} rows", history.height());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use polars::prelude::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::debug;

use stocks_core::frame::{DATE_COL, date_column};
use stocks_core::{
    HistoryQuery, Result, SnapshotModule, StatementFrequency, StatementProvider, StocksError,
    Symbol,
};

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance fundamentals timeseries API base URL.
const TIMESERIES_API_URL: &str =
    "https://query1.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Earliest timestamp requested from the timeseries API.
const TIMESERIES_START: i64 = 493_590_046;

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Income statement fields requested from the timeseries API.
const INCOME_FIELDS: &[&str] = &[
    "TotalRevenue",
    "GrossProfit",
    "OperatingIncome",
    "NetIncome",
    "EBITDA",
];

/// Cash flow statement fields requested from the timeseries API.
const CASHFLOW_FIELDS: &[&str] = &[
    "FreeCashFlow",
    "CapitalExpenditure",
    "StockBasedCompensation",
    "OperatingCashFlow",
];

/// Balance sheet fields requested from the timeseries API.
const BALANCE_FIELDS: &[&str] = &["CashAndCashEquivalents", "TotalDebt", "TotalAssets"];

/// Valuation measure fields requested from the timeseries API.
const VALUATION_FIELDS: &[&str] = &[
    "PeRatio",
    "ForwardPeRatio",
    "PsRatio",
    "PbRatio",
    "PegRatio",
    "EnterprisesValueEBITDARatio",
    "EnterprisesValueRevenueRatio",
    "MarketCap",
    "EnterpriseValue",
];

/// Yahoo Finance data provider.
///
/// Implements [`StatementProvider`] with built-in rate limiting.
#[derive(Debug)]
pub struct YahooProvider {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new provider with a custom HTTP client.
    ///
    /// Rate limiting is still applied.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new provider with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            rate_limit_ms: rate_limit.as_millis() as u64,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            Ordering::Relaxed,
        );
    }

    /// Make a rate-limited GET request and parse the JSON response.
    async fn get_json<T: DeserializeOwned>(&self, symbol: &Symbol, url: &str) -> Result<T> {
        self.apply_rate_limit().await;
        debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StocksError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(StocksError::RateLimited {
                provider: "Yahoo Finance".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StocksError::SymbolNotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(StocksError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StocksError::Parse(e.to_string()))
    }

    /// Build the chart API URL for a symbol and history query.
    fn build_chart_url(&self, symbol: &Symbol, query: &HistoryQuery) -> String {
        let interval = query.interval.as_str();
        if let Some(start) = query.start {
            let period1 = start
                .and_hms_opt(0, 0, 0)
                .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
                .unwrap_or(0);
            let period2 = query
                .end
                .and_then(|end| end.and_hms_opt(23, 59, 59))
                .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
                .unwrap_or_else(|| Utc::now().timestamp());
            format!(
                "{}/{}?period1={}&period2={}&interval={}&events=div&includeAdjustedClose=true",
                CHART_API_URL,
                symbol.as_str(),
                period1,
                period2,
                interval
            )
        } else {
            let range = query.period.as_deref().unwrap_or("5y");
            format!(
                "{}/{}?range={}&interval={}&events=div&includeAdjustedClose=true",
                CHART_API_URL,
                symbol.as_str(),
                range,
                interval
            )
        }
    }

    /// Build the timeseries API URL for a symbol and list of type keys.
    fn build_timeseries_url(&self, symbol: &Symbol, types: &[String]) -> String {
        format!(
            "{}/{}?symbol={}&type={}&period1={}&period2={}&merge=false",
            TIMESERIES_API_URL,
            symbol.as_str(),
            symbol.as_str(),
            types.join(","),
            TIMESERIES_START,
            Utc::now().timestamp()
        )
    }

    /// Fetch timeseries blocks for prefixed field names.
    async fn fetch_timeseries(
        &self,
        symbol: &Symbol,
        prefix: &str,
        fields: &[&str],
    ) -> Result<Vec<SeriesBlock>> {
        let types: Vec<String> = fields.iter().map(|f| format!("{prefix}{f}")).collect();
        let url = self.build_timeseries_url(symbol, &types);
        let response: TimeseriesResponse = self.get_json(symbol, &url).await?;

        if let Some(error) = response.timeseries.error {
            return Err(StocksError::Network(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        Ok(collect_blocks(prefix, response))
    }

    /// Fetch one statement table as a date-indexed DataFrame.
    async fn fetch_statement(
        &self,
        symbol: &Symbol,
        prefix: &str,
        fields: &[&str],
    ) -> Result<DataFrame> {
        let blocks = self.fetch_timeseries(symbol, prefix, fields).await?;
        statement_frame(symbol, fields, &blocks)
    }

    /// Parse a chart API response into a price history DataFrame.
    fn parse_chart_response(&self, symbol: &Symbol, response: ChartResponse) -> Result<DataFrame> {
        let result = response
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| StocksError::SymbolNotFound(symbol.to_string()))?;

        let timestamps = result.timestamp.unwrap_or_default();

        if timestamps.is_empty() {
            return Err(StocksError::DataNotAvailable {
                symbol: symbol.to_string(),
                start: "N/A".to_string(),
                end: "N/A".to_string(),
            });
        }

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| StocksError::Parse("Missing quote data".to_string()))?;

        let adj_close = result
            .indicators
            .adjclose
            .and_then(|ac| ac.into_iter().next())
            .map(|ac| ac.adjclose)
            .unwrap_or_default();

        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = timestamps
            .iter()
            .map(|&ts| {
                Utc.timestamp_opt(ts, 0)
                    .single()
                    .map(|dt| dt.date_naive())
                    .unwrap_or(epoch)
            })
            .collect();

        // dividend events keyed by payment date; zero everywhere else
        let paid: HashMap<NaiveDate, f64> = result
            .events
            .and_then(|ev| ev.dividends)
            .unwrap_or_default()
            .into_values()
            .filter_map(|div| {
                Utc.timestamp_opt(div.date, 0)
                    .single()
                    .map(|dt| (dt.date_naive(), div.amount))
            })
            .collect();
        let dividends: Vec<f64> = dates
            .iter()
            .map(|d| paid.get(d).copied().unwrap_or(0.0))
            .collect();

        let closes: Vec<Option<f64>> = quote.close;
        let adj_closes: Vec<Option<f64>> = if adj_close.len() == dates.len() {
            adj_close
        } else {
            closes.clone()
        };

        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates)?,
            Column::new("open".into(), quote.open),
            Column::new("high".into(), quote.high),
            Column::new("low".into(), quote.low),
            Column::new("close".into(), closes),
            Column::new("volume".into(), quote.volume),
            Column::new("adjusted_close".into(), adj_closes),
            Column::new("dividends".into(), dividends),
        ])?;

        Ok(df)
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatementProvider for YahooProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn income_statement(
        &self,
        symbol: &Symbol,
        frequency: StatementFrequency,
        trailing: bool,
    ) -> Result<DataFrame> {
        let prefix = statement_prefix(frequency, trailing);
        self.fetch_statement(symbol, prefix, INCOME_FIELDS).await
    }

    async fn cash_flow(
        &self,
        symbol: &Symbol,
        frequency: StatementFrequency,
        trailing: bool,
    ) -> Result<DataFrame> {
        let prefix = statement_prefix(frequency, trailing);
        self.fetch_statement(symbol, prefix, CASHFLOW_FIELDS).await
    }

    async fn balance_sheet(
        &self,
        symbol: &Symbol,
        frequency: StatementFrequency,
    ) -> Result<DataFrame> {
        self.fetch_statement(symbol, frequency.vendor_prefix(), BALANCE_FIELDS)
            .await
    }

    async fn valuation_measures(&self, symbol: &Symbol) -> Result<DataFrame> {
        let prefix = StatementFrequency::Quarterly.vendor_prefix();
        let blocks = self
            .fetch_timeseries(symbol, prefix, VALUATION_FIELDS)
            .await?;
        valuation_frame(symbol, VALUATION_FIELDS, &blocks)
    }

    async fn price_history(&self, symbol: &Symbol, query: &HistoryQuery) -> Result<DataFrame> {
        query.validate()?;
        if let (Some(start), Some(end)) = (query.start, query.end) {
            if start > end {
                return Err(StocksError::InvalidParameter(format!(
                    "Start date {start} is after end date {end}"
                )));
            }
        }

        let url = self.build_chart_url(symbol, query);
        let response: ChartResponse = self.get_json(symbol, &url).await?;

        if let Some(error) = response.chart.error {
            if error.code == "Not Found" {
                return Err(StocksError::SymbolNotFound(symbol.to_string()));
            }
            return Err(StocksError::Network(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        self.parse_chart_response(symbol, response)
    }

    async fn snapshot(
        &self,
        symbol: &Symbol,
        module: SnapshotModule,
    ) -> Result<serde_json::Value> {
        let url = format!(
            "{}/{}?modules={}",
            QUOTE_SUMMARY_URL,
            symbol.as_str(),
            module.module_name()
        );
        let value: serde_json::Value = self.get_json(symbol, &url).await?;
        value
            .pointer(&format!("/quoteSummary/result/0/{}", module.module_name()))
            .cloned()
            .ok_or_else(|| {
                StocksError::Parse(format!(
                    "missing {} module in quote summary for {}",
                    module.module_name(),
                    symbol
                ))
            })
    }
}

/// Timeseries type prefix for a statement fetch.
const fn statement_prefix(frequency: StatementFrequency, trailing: bool) -> &'static str {
    if trailing {
        "trailing"
    } else {
        frequency.vendor_prefix()
    }
}

/// One field's reported series, prefix already stripped.
#[derive(Debug)]
struct SeriesBlock {
    field: String,
    points: Vec<TimeseriesPoint>,
}

/// Extract per-field series blocks from a timeseries response.
fn collect_blocks(prefix: &str, response: TimeseriesResponse) -> Vec<SeriesBlock> {
    let mut blocks = Vec::new();
    for data in response.timeseries.result {
        let Some(type_name) = data.meta.types.first() else {
            continue;
        };
        let Some(field) = type_name.strip_prefix(prefix) else {
            continue;
        };
        let Some(raw) = data.series.get(type_name) else {
            continue;
        };
        let Ok(points) = serde_json::from_value::<Vec<Option<TimeseriesPoint>>>(raw.clone()) else {
            continue;
        };
        blocks.push(SeriesBlock {
            field: field.to_string(),
            points: points.into_iter().flatten().collect(),
        });
    }
    blocks
}

/// Parse a vendor `asOfDate` string (YYYY-MM-DD).
fn parse_as_of_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| StocksError::Parse(format!("bad asOfDate {s:?}: {e}")))
}

/// Gather blocks into the union of reporting dates plus per-date values.
#[allow(clippy::type_complexity)]
fn gather_points<'a>(
    blocks: &'a [SeriesBlock],
) -> Result<(
    Vec<NaiveDate>,
    BTreeMap<NaiveDate, String>,
    HashMap<&'a str, BTreeMap<NaiveDate, f64>>,
)> {
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut period_types: BTreeMap<NaiveDate, String> = BTreeMap::new();
    let mut values: HashMap<&str, BTreeMap<NaiveDate, f64>> = HashMap::new();
    for block in blocks {
        let series = values.entry(block.field.as_str()).or_default();
        for point in &block.points {
            let date = parse_as_of_date(&point.as_of_date)?;
            dates.insert(date);
            period_types
                .entry(date)
                .or_insert_with(|| point.period_type.clone());
            if let Some(raw) = point.reported_value.as_ref().and_then(|v| v.raw) {
                series.insert(date, raw);
            }
        }
    }
    Ok((dates.into_iter().collect(), period_types, values))
}

/// Assemble statement blocks into a `Date`-indexed DataFrame.
///
/// Fields the vendor did not return at all produce no column; the
/// downstream extractors surface those as `MissingField`.
fn statement_frame(symbol: &Symbol, fields: &[&str], blocks: &[SeriesBlock]) -> Result<DataFrame> {
    let (dates, _, values) = gather_points(blocks)?;
    if dates.is_empty() {
        return Err(StocksError::DataNotAvailable {
            symbol: symbol.to_string(),
            start: "N/A".to_string(),
            end: "N/A".to_string(),
        });
    }

    let mut columns = vec![date_column(DATE_COL, &dates)?];
    for &field in fields {
        if let Some(series) = values.get(field) {
            let col_values: Vec<Option<f64>> =
                dates.iter().map(|d| series.get(d).copied()).collect();
            columns.push(Column::new(field.into(), col_values));
        }
    }
    let df = DataFrame::new(columns)?;
    Ok(df)
}

/// Assemble valuation blocks into the raw vendor shape
/// (`asOfDate`, `periodType`, ratio fields).
fn valuation_frame(symbol: &Symbol, fields: &[&str], blocks: &[SeriesBlock]) -> Result<DataFrame> {
    let (dates, period_types, values) = gather_points(blocks)?;
    if dates.is_empty() {
        return Err(StocksError::DataNotAvailable {
            symbol: symbol.to_string(),
            start: "N/A".to_string(),
            end: "N/A".to_string(),
        });
    }

    let periods: Vec<String> = dates
        .iter()
        .map(|d| period_types.get(d).cloned().unwrap_or_default())
        .collect();
    let mut columns = vec![
        date_column("asOfDate", &dates)?,
        Column::new("periodType".into(), periods),
    ];
    for &field in fields {
        if let Some(series) = values.get(field) {
            let col_values: Vec<Option<f64>> =
                dates.iter().map(|d| series.get(d).copied()).collect();
            columns.push(Column::new(field.into(), col_values));
        }
    }
    let df = DataFrame::new(columns)?;
    Ok(df)
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Vec<ChartData>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
    events: Option<ChartEvents>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    dividends: Option<HashMap<String, DividendEvent>>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

/// Fundamentals timeseries API response.
#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    timeseries: TimeseriesResult,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResult {
    result: Vec<TimeseriesData>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesData {
    meta: TimeseriesMeta,
    #[serde(flatten)]
    series: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesMeta {
    #[serde(rename = "type")]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesPoint {
    #[serde(rename = "asOfDate")]
    as_of_date: String,
    #[serde(rename = "periodType", default)]
    period_type: String,
    #[serde(rename = "reportedValue")]
    reported_value: Option<ReportedValue>,
}

#[derive(Debug, Deserialize)]
struct ReportedValue {
    raw: Option<f64>,
}
