//! Small table helpers shared by the metric builders.
//!
//! Every table in this workspace is a polars [`DataFrame`] carrying a
//! [`DATE_COL`] column of dtype `Date` in place of a pandas-style index.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::{Result, StocksError};

/// Name of the date column every derived table is keyed by.
pub const DATE_COL: &str = "Date";

/// Checks that every listed column is present in `df`.
///
/// A required column that is absent is a schema contract violation by the
/// upstream provider and fails with [`StocksError::MissingField`]. A column
/// that is present but holds nulls is not an error; the builders filter
/// those rows instead.
pub fn require_columns(df: &DataFrame, fields: &[&str]) -> Result<()> {
    for &field in fields {
        if df.column(field).is_err() {
            return Err(StocksError::MissingField {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

/// Builds a polars `Date` column from chrono dates.
pub fn date_column(name: &str, dates: &[NaiveDate]) -> Result<Column> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let days: Vec<i32> = dates.iter().map(|d| (*d - epoch).num_days() as i32).collect();
    let column = Column::new(name.into(), days).cast(&DataType::Date)?;
    Ok(column)
}

/// Removes every row containing at least one null value.
pub fn drop_null_rows(df: &DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let Some(mask) = non_null_mask(&names) else {
        return Ok(df.clone());
    };
    let out = df.clone().lazy().filter(mask).collect()?;
    Ok(out)
}

/// Returns the last row of a table as a single-row frame, or `None` when the
/// table is empty. This is the "latest snapshot" of any time-indexed table.
#[must_use]
pub fn latest_row(df: &DataFrame) -> Option<DataFrame> {
    if df.height() == 0 {
        None
    } else {
        Some(df.tail(Some(1)))
    }
}

/// Conjunction of `is_not_null` over the named columns, or `None` when the
/// list is empty.
pub(crate) fn non_null_mask<S: AsRef<str>>(names: &[S]) -> Option<Expr> {
    names.iter().fold(None, |acc, name| {
        let e = col(name.as_ref()).is_not_null();
        Some(match acc {
            Some(a) => a.and(e),
            None => e,
        })
    })
}

/// Conjunction of `is_not_null` over the named columns as a filter
/// expression; an empty list keeps every row.
#[must_use]
pub fn all_present<S: AsRef<str>>(names: &[S]) -> Expr {
    non_null_mask(names).unwrap_or_else(|| lit(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        let dates = [
            NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        ];
        DataFrame::new(vec![
            date_column(DATE_COL, &dates).unwrap(),
            Column::new("value".into(), [Some(1.0), None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_require_columns_present() {
        let df = sample();
        assert!(require_columns(&df, &[DATE_COL, "value"]).is_ok());
    }

    #[test]
    fn test_require_columns_missing() {
        let df = sample();
        let err = require_columns(&df, &["value", "absent"]).unwrap_err();
        assert!(matches!(err, StocksError::MissingField { field } if field == "absent"));
    }

    #[test]
    fn test_drop_null_rows() {
        let df = sample();
        let out = drop_null_rows(&df).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn test_latest_row() {
        let df = sample();
        let last = latest_row(&df).unwrap();
        assert_eq!(last.height(), 1);
        assert!(
            last.column("value")
                .unwrap()
                .as_materialized_series()
                .f64()
                .unwrap()
                .get(0)
                .is_none()
        );
    }

    #[test]
    fn test_latest_row_empty() {
        let df = DataFrame::new(vec![Column::new("value".into(), Vec::<f64>::new())]).unwrap();
        assert!(latest_row(&df).is_none());
    }
}
