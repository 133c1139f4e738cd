//! Derived dividend series.
//!
//! Composition rules over the price history and dividend tables: yield at
//! each payment date, and period-over-period dividend growth via the growth
//! engine.

use polars::prelude::*;
use stocks_core::frame::{DATE_COL, require_columns};

use crate::growth::compute_growth;
use stocks_core::error::Result;

/// Output column of [`dividend_yield_history`].
const YIELD_COL: &str = "Dividend Yield (%)";

/// Output column [`dividend_growth`] derives from the `Dividend` input.
const GROWTH_COL: &str = "Dividend Growth (%)";

/// Dividend yield at each payment date, based on the closing price.
///
/// `dividends / close * 100` per row of the price history, restricted to
/// strictly positive values and rounded to two decimals. Requires the
/// history's `close` and `dividends` columns.
pub fn dividend_yield_history(price_history: &DataFrame) -> Result<DataFrame> {
    require_columns(price_history, &["close", "dividends"])?;
    let out = price_history
        .clone()
        .lazy()
        .select([
            col(DATE_COL),
            (col("dividends") / col("close") * lit(100.0)).alias(YIELD_COL),
        ])
        .filter(col(YIELD_COL).gt(0.0))
        .with_columns([col(YIELD_COL).round(2)])
        .collect()?;
    Ok(out)
}

/// Period-over-period growth in dividend payments.
///
/// Runs the growth engine over the `Date`/`Dividend` table and keeps the
/// strictly positive growth values.
pub fn dividend_growth(dividend_history: &DataFrame) -> Result<DataFrame> {
    require_columns(dividend_history, &["Dividend"])?;
    let growth = compute_growth(dividend_history, 1)?;
    let out = growth.lazy().filter(col(GROWTH_COL).gt(0.0)).collect()?;
    Ok(out)
}
