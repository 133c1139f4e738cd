//! Period-over-period growth computation.
//!
//! Works on any metric table: fundamentals, dividends, or otherwise. Column
//! units are decided once at the boundary by naming convention and carried
//! as [`MetricUnit`] tags; the algorithm branches on the tag, never on the
//! name.

use polars::prelude::*;
use stocks_core::frame::DATE_COL;

use stocks_core::error::Result;

/// Unit of a metric column, deciding its growth semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricUnit {
    /// Fractional ratio (margins); deltas are reported in basis points.
    Ratio,
    /// Absolute value; growth is reported as percent change.
    Absolute,
}

impl MetricUnit {
    /// Derives the unit from the naming convention: columns ending in
    /// `"Margin"` hold fractional ratios.
    #[must_use]
    pub fn from_column_name(name: &str) -> Self {
        if name.ends_with("Margin") {
            Self::Ratio
        } else {
            Self::Absolute
        }
    }

    /// Suffix appended to the source column name in the growth table.
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Ratio => " Change (bps)",
            Self::Absolute => " Growth (%)",
        }
    }
}

/// Computes period-over-period growth for every metric column of a table.
///
/// For each non-date column, in original column order:
///
/// - ratio columns (per [`MetricUnit::from_column_name`]): absolute change
///   over `lag_periods` rows scaled to basis points,
///   `(v - v.shift(lag)) * 100`, named `"<col> Change (bps)"`;
/// - absolute columns: percent change over `lag_periods` rows,
///   `(v - prev) / prev * 100`, named `"<col> Growth (%)"`; a zero or null
///   previous value yields null.
///
/// Every output is rounded to two decimals. A row is dropped only when all
/// of its derived values are null; rows with a mix of null and non-null
/// outputs are retained. The first `lag_periods` rows have no prior value
/// to compare against and fall out of the table through that same rule.
pub fn compute_growth(df: &DataFrame, lag_periods: i64) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|name| name.as_str() != DATE_COL)
        .map(|name| name.to_string())
        .collect();

    let mut exprs: Vec<Expr> = Vec::with_capacity(names.len() + 1);
    if df.column(DATE_COL).is_ok() {
        exprs.push(col(DATE_COL));
    }
    let mut derived: Vec<String> = Vec::with_capacity(names.len());
    for name in &names {
        let unit = MetricUnit::from_column_name(name);
        let out_name = format!("{name}{}", unit.suffix());
        let expr = match unit {
            MetricUnit::Ratio => {
                (col(name.as_str()) - col(name.as_str()).shift(lit(lag_periods))) * lit(100.0)
            }
            MetricUnit::Absolute => {
                let prev = col(name.as_str()).shift(lit(lag_periods));
                when(prev.clone().eq(0.0))
                    .then(lit(NULL))
                    .otherwise((col(name.as_str()) - prev.clone()) / prev * lit(100.0))
            }
        };
        exprs.push(expr.round(2).alias(out_name.as_str()));
        derived.push(out_name);
    }

    let mut growth = df.clone().lazy().select(exprs);
    // drop rows only when every derived value is null
    if let Some(any_present) = derived
        .iter()
        .map(|name| col(name.as_str()).is_not_null())
        .reduce(Expr::or)
    {
        growth = growth.filter(any_present);
    }
    let out = growth.collect()?;
    Ok(out)
}

/// Compound annual growth rate between two values over `periods` periods.
///
/// Returns the growth rate as a fraction (0.10 for 10% per period). The
/// growth rate is undefined for a non-positive start value or zero periods;
/// those return `NaN` rather than erroring, and scalar callers must check
/// for it explicitly.
#[must_use]
pub fn cagr(start: f64, end: f64, periods: u32) -> f64 {
    if start <= 0.0 || periods == 0 {
        return f64::NAN;
    }
    (end / start).powf(1.0 / f64::from(periods)) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use stocks_core::frame::date_column;

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2019 + i as i32, 12, 31).unwrap())
            .collect()
    }

    fn f64_at(df: &DataFrame, name: &str, idx: usize) -> Option<f64> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .get(idx)
    }

    #[test]
    fn test_unit_from_name() {
        assert_eq!(MetricUnit::from_column_name("NetMargin"), MetricUnit::Ratio);
        assert_eq!(
            MetricUnit::from_column_name("Gross Margin"),
            MetricUnit::Ratio
        );
        assert_eq!(
            MetricUnit::from_column_name("TotalRevenue"),
            MetricUnit::Absolute
        );
    }

    #[test]
    fn test_output_column_names() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(2)).unwrap(),
            Column::new("TotalRevenue".into(), [100.0, 110.0]),
            Column::new("NetMargin".into(), [0.30, 0.33]),
        ])
        .unwrap();
        let out = compute_growth(&df, 1).unwrap();
        let names: Vec<String> = out
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Date",
                "TotalRevenue Growth (%)",
                "NetMargin Change (bps)"
            ]
        );
    }

    #[test]
    fn test_percent_change_math() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(2)).unwrap(),
            Column::new("TotalRevenue".into(), [100.0, 110.0]),
        ])
        .unwrap();
        let out = compute_growth(&df, 1).unwrap();
        assert_eq!(out.height(), 1);
        assert_relative_eq!(f64_at(&out, "TotalRevenue Growth (%)", 0).unwrap(), 10.0);
    }

    #[test]
    fn test_basis_point_math() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(2)).unwrap(),
            Column::new("NetMargin".into(), [0.30, 0.33]),
        ])
        .unwrap();
        let out = compute_growth(&df, 1).unwrap();
        assert_eq!(out.height(), 1);
        assert_relative_eq!(f64_at(&out, "NetMargin Change (bps)", 0).unwrap(), 3.0);
    }

    #[test]
    fn test_zero_denominator_yields_null() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(3)).unwrap(),
            Column::new("TotalRevenue".into(), [0.0, 110.0, 121.0]),
        ])
        .unwrap();
        let out = compute_growth(&df, 1).unwrap();
        // first row lost to the lag, second lost to the zero denominator
        assert_eq!(out.height(), 1);
        assert_relative_eq!(f64_at(&out, "TotalRevenue Growth (%)", 0).unwrap(), 10.0);
    }

    #[test]
    fn test_mixed_null_row_retained() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(3)).unwrap(),
            Column::new("TotalRevenue".into(), [Some(100.0), Some(110.0), Some(121.0)]),
            Column::new("NetIncome".into(), [Some(10.0), None, Some(12.0)]),
        ])
        .unwrap();
        let out = compute_growth(&df, 1).unwrap();
        // leading row is all-null and dropped; the two remaining rows each
        // have at least one non-null output
        assert_eq!(out.height(), 2);
        assert!(f64_at(&out, "NetIncome Growth (%)", 0).is_none());
        assert!(f64_at(&out, "NetIncome Growth (%)", 1).is_none());
        assert_relative_eq!(f64_at(&out, "TotalRevenue Growth (%)", 1).unwrap(), 10.0);
    }

    #[test]
    fn test_longer_lag() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(5)).unwrap(),
            Column::new("TotalRevenue".into(), [100.0, 102.0, 104.0, 106.0, 150.0]),
        ])
        .unwrap();
        let out = compute_growth(&df, 4).unwrap();
        assert_eq!(out.height(), 1);
        assert_relative_eq!(f64_at(&out, "TotalRevenue Growth (%)", 0).unwrap(), 50.0);
    }

    #[test]
    fn test_outputs_rounded() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(2)).unwrap(),
            Column::new("TotalRevenue".into(), [3.0, 4.0]),
        ])
        .unwrap();
        let out = compute_growth(&df, 1).unwrap();
        // (4 - 3) / 3 * 100 = 33.333... -> 33.33
        assert_relative_eq!(f64_at(&out, "TotalRevenue Growth (%)", 0).unwrap(), 33.33);
    }

    #[test]
    fn test_cagr() {
        assert_relative_eq!(cagr(100.0, 200.0, 1), 1.0);
        assert_relative_eq!(cagr(100.0, 100.0, 5), 0.0);
        assert_relative_eq!(cagr(100.0, 121.0, 2), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_cagr_undefined_domain() {
        assert!(cagr(0.0, 100.0, 5).is_nan());
        assert!(cagr(-10.0, 100.0, 5).is_nan());
        assert!(cagr(100.0, 200.0, 0).is_nan());
    }
}
