//! Valuation ratio table builder.
//!
//! Transforms the vendor's raw valuation-measures table into a date-indexed
//! table of the six display ratios. Vendor bookkeeping columns (`asOfDate`,
//! `periodType`) and raw size columns (market cap, enterprise value) never
//! reach the output; their absence from the input is tolerated, the absence
//! of a ratio field is not.

use polars::prelude::*;
use stocks_core::frame::{DATE_COL, all_present, require_columns};

use stocks_core::error::Result;

/// Vendor as-of timestamp column the date index is derived from.
const AS_OF_COL: &str = "asOfDate";

/// Vendor-to-display renames for the required valuation ratios, in output
/// column order.
pub const VALUATION_FIELDS: [(&str, &str); 6] = [
    ("PeRatio", "P/E"),
    ("ForwardPeRatio", "Forward P/E"),
    ("PsRatio", "P/S"),
    ("PbRatio", "P/B"),
    ("EnterprisesValueEBITDARatio", "EV/EBITDA"),
    ("EnterprisesValueRevenueRatio", "EV/Revenue"),
];

/// Builds the valuation ratio table from raw vendor valuation measures.
///
/// Derives a date-only index from the `asOfDate` column, renames the six
/// required ratio fields to display names, selects exactly those six in
/// order, rounds to two decimals, drops rows with any null among them and
/// sorts ascending by date. A required ratio field absent from the input is
/// a fatal [`StocksError::MissingField`](stocks_core::StocksError).
pub fn build_valuation(df: &DataFrame) -> Result<DataFrame> {
    let mut required: Vec<&str> = vec![AS_OF_COL];
    required.extend(VALUATION_FIELDS.iter().map(|(vendor, _)| *vendor));
    require_columns(df, &required)?;

    let mut selection: Vec<Expr> = Vec::with_capacity(VALUATION_FIELDS.len() + 1);
    selection.push(col(AS_OF_COL).cast(DataType::Date).alias(DATE_COL));
    let mut display: Vec<&str> = Vec::with_capacity(VALUATION_FIELDS.len());
    for (vendor, name) in VALUATION_FIELDS {
        selection.push(col(vendor).round(2).alias(name));
        display.push(name);
    }

    let out = df
        .clone()
        .lazy()
        .select(selection)
        .filter(all_present(&display))
        .sort([DATE_COL], SortMultipleOptions::default())
        .collect()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use stocks_core::error::StocksError;
    use stocks_core::frame::date_column;

    fn raw_valuation() -> DataFrame {
        let dates = [
            NaiveDate::from_ymd_opt(2023, 9, 30).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
        ];
        DataFrame::new(vec![
            date_column(AS_OF_COL, &dates).unwrap(),
            Column::new("periodType".into(), ["3M", "3M"]),
            Column::new("PeRatio".into(), [Some(27.456), Some(31.2)]),
            Column::new("ForwardPeRatio".into(), [Some(25.1), Some(28.9)]),
            Column::new("PsRatio".into(), [Some(7.125), Some(7.8)]),
            Column::new("PbRatio".into(), [Some(44.9), Some(46.1)]),
            Column::new(
                "EnterprisesValueEBITDARatio".into(),
                [Some(21.004), Some(22.7)],
            ),
            Column::new(
                "EnterprisesValueRevenueRatio".into(),
                [Some(6.9), Some(7.4)],
            ),
            Column::new("marketCap".into(), [2.7e12, 2.9e12]),
        ])
        .unwrap()
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
    fn test_renamed_selected_and_sorted() {
        let out = build_valuation(&raw_valuation()).unwrap();
        let names: Vec<String> = out
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Date",
                "P/E",
                "Forward P/E",
                "P/S",
                "P/B",
                "EV/EBITDA",
                "EV/Revenue"
            ]
        );
        // input was newest-first; output is ascending, so June comes first
        assert_relative_eq!(f64_at(&out, "P/E", 0).unwrap(), 31.2);
    }

    #[test]
    fn test_rounded_to_two_decimals() {
        let out = build_valuation(&raw_valuation()).unwrap();
        assert_relative_eq!(f64_at(&out, "P/E", 1).unwrap(), 27.46);
        assert_relative_eq!(f64_at(&out, "P/S", 1).unwrap(), 7.13);
        assert_relative_eq!(f64_at(&out, "EV/EBITDA", 1).unwrap(), 21.0);
    }

    #[test]
    fn test_null_row_dropped() {
        let df = raw_valuation()
            .lazy()
            .with_columns([when(col("PeRatio").gt(30.0))
                .then(lit(NULL))
                .otherwise(col("PbRatio"))
                .alias("PbRatio")])
            .collect()
            .unwrap();
        let out = build_valuation(&df).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn test_tolerates_absent_market_cap() {
        let df = raw_valuation().drop("marketCap").unwrap();
        let out = build_valuation(&df).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_missing_ratio_is_fatal() {
        let df = raw_valuation().drop("PbRatio").unwrap();
        let err = build_valuation(&df).unwrap_err();
        assert!(matches!(err, StocksError::MissingField { field } if field == "PbRatio"));
    }
}
