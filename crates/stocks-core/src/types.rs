//! Core data types for the metric pipeline.
//!
//! - [`Symbol`] - trading symbol/ticker
//! - [`HistoryQuery`] - price history parameter bag
//! - [`HistoryUpdate`] - partial update applied by a history refresh

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StocksError};
use crate::frequency::Interval;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Parameters for a price history fetch.
///
/// Either a lookback `period` (vendor notation, e.g. `"1mo"`, `"5y"`) or an
/// explicit `start`/`end` window must be set; `start` takes precedence when
/// both are present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Lookback window (e.g. `"5y"`); ignored if `start` is set.
    pub period: Option<String>,
    /// Start of an explicit date window.
    pub start: Option<NaiveDate>,
    /// End of an explicit date window; open-ended when `None`.
    pub end: Option<NaiveDate>,
    /// Bar granularity.
    pub interval: Interval,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            period: Some("5y".to_string()),
            start: None,
            end: None,
            interval: Interval::Daily,
        }
    }
}

impl HistoryQuery {
    /// Creates a query for a lookback period with daily bars.
    #[must_use]
    pub fn period(period: impl Into<String>) -> Self {
        Self {
            period: Some(period.into()),
            start: None,
            end: None,
            interval: Interval::Daily,
        }
    }

    /// Creates a query for an explicit date window with daily bars.
    #[must_use]
    pub const fn range(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self {
            period: None,
            start: Some(start),
            end,
            interval: Interval::Daily,
        }
    }

    /// Sets the bar granularity.
    #[must_use]
    pub const fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    /// Checks that either a period or a start date is specified.
    pub fn validate(&self) -> Result<()> {
        if self.period.is_none() && self.start.is_none() {
            return Err(StocksError::InvalidParameter(
                "must specify either `period` or `start` to fetch history".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies a partial update, mirroring a history refresh.
    ///
    /// Setting `period` clears any explicit window; setting `start` clears
    /// the period. An `interval` update is independent of both.
    pub fn apply(&mut self, update: &HistoryUpdate) {
        if let Some(period) = &update.period {
            self.period = Some(period.clone());
            self.start = None;
            self.end = None;
        }
        if let Some(start) = update.start {
            self.start = Some(start);
            self.end = update.end;
            self.period = None;
        }
        if let Some(interval) = update.interval {
            self.interval = interval;
        }
    }
}

/// Partial update to a [`HistoryQuery`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryUpdate {
    /// New lookback window; overrides and clears `start`/`end` when set.
    pub period: Option<String>,
    /// New window start; clears `period` when set.
    pub start: Option<NaiveDate>,
    /// New window end; only applied together with `start`.
    pub end: Option<NaiveDate>,
    /// New bar granularity.
    pub interval: Option<Interval>,
}
