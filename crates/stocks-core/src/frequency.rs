//! Statement frequency and price history interval definitions.
//!
//! [`StatementFrequency`] selects the reporting period of fundamental
//! statements, [`Interval`] the granularity of price history.

use serde::{Deserialize, Serialize};

/// Reporting frequency of a financial statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementFrequency {
    /// Annual reporting period.
    #[default]
    Annual,
    /// Quarterly reporting period.
    Quarterly,
}

impl StatementFrequency {
    /// Returns the prefix the vendor timeseries API uses for this frequency.
    #[must_use]
    pub const fn vendor_prefix(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

/// Granularity of price history data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// One-minute bars.
    Minute,
    /// Five-minute bars.
    FiveMinute,
    /// Fifteen-minute bars.
    FifteenMinute,
    /// Thirty-minute bars.
    ThirtyMinute,
    /// Hourly bars.
    Hourly,
    /// Daily bars.
    #[default]
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

impl Interval {
    /// Returns the vendor interval string (e.g. `"1d"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "1m",
            Self::FiveMinute => "5m",
            Self::FifteenMinute => "15m",
            Self::ThirtyMinute => "30m",
            Self::Hourly => "1h",
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }

    /// Returns true if this is an intraday interval.
    #[must_use]
    pub const fn is_intraday(&self) -> bool {
        matches!(
            self,
            Self::Minute
                | Self::FiveMinute
                | Self::FifteenMinute
                | Self::ThirtyMinute
                | Self::Hourly
        )
    }
}
