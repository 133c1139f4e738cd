//! Statement metric extraction and the combined fundamentals table.
//!
//! Each extractor is a pure `Table -> Table` function that selects a fixed
//! set of vendor fields, normalizes sign conventions, and drops rows that
//! are incomplete for downstream ratio computation. The builder aligns the
//! three extracts on their shared date column with inner-join semantics, so
//! a period survives only when all three statements cover it.

use polars::prelude::*;
use stocks_core::frame::{DATE_COL, all_present, require_columns};
use stocks_core::humanize;

use stocks_core::error::Result;

/// Income statement fields required by the fundamentals builder.
pub const INCOME_FIELDS: [&str; 4] = [
    "TotalRevenue",
    "GrossProfit",
    "OperatingIncome",
    "NetIncome",
];

/// Cash flow statement fields required by the fundamentals builder.
pub const CASHFLOW_FIELDS: [&str; 3] = [
    "FreeCashFlow",
    "CapitalExpenditure",
    "StockBasedCompensation",
];

/// Balance sheet fields required by the fundamentals builder.
pub const BALANCE_FIELDS: [&str; 2] = ["CashAndCashEquivalents", "TotalDebt"];

/// Date column plus the given fields, in order.
fn selection(fields: &[&str]) -> Vec<Expr> {
    std::iter::once(col(DATE_COL))
        .chain(fields.iter().map(|f| col(*f)))
        .collect()
}

/// Division that yields null instead of a non-finite value when the
/// denominator is zero or null.
fn safe_div(num: Expr, den: Expr) -> Expr {
    when(den.clone().eq(0.0))
        .then(lit(NULL))
        .otherwise(num / den)
}

/// Extracts the key income statement metrics.
///
/// Selects `TotalRevenue`, `GrossProfit`, `OperatingIncome` and `NetIncome`
/// and drops rows with a null in any of them. No sign changes.
pub fn extract_income_metrics(df: &DataFrame) -> Result<DataFrame> {
    require_columns(df, &INCOME_FIELDS)?;
    let out = df
        .clone()
        .lazy()
        .select(selection(&INCOME_FIELDS))
        .filter(all_present(&INCOME_FIELDS))
        .collect()?;
    Ok(out)
}

/// Extracts the key cash flow metrics.
///
/// Selects `FreeCashFlow`, `CapitalExpenditure` and `StockBasedCompensation`
/// and negates `CapitalExpenditure`: the vendor reports it as a negative
/// cash outflow, the output convention is positive-as-expense. Nulls are
/// checked on both sides of the negation.
pub fn extract_cashflow_metrics(df: &DataFrame) -> Result<DataFrame> {
    require_columns(df, &CASHFLOW_FIELDS)?;
    let out = df
        .clone()
        .lazy()
        .select(selection(&CASHFLOW_FIELDS))
        .filter(all_present(&CASHFLOW_FIELDS))
        .with_columns([(col("CapitalExpenditure") * lit(-1.0)).alias("CapitalExpenditure")])
        .filter(all_present(&CASHFLOW_FIELDS))
        .collect()?;
    Ok(out)
}

/// Extracts the key balance sheet metrics and computes the leverage ratio.
///
/// Selects `CashAndCashEquivalents` (renamed to `Cash`) and `TotalDebt`,
/// then computes `DebtToCash = TotalDebt / Cash`. A zero or null cash
/// balance yields a null ratio, and the row is dropped with the rest of the
/// incomplete rows.
pub fn extract_balance_metrics(df: &DataFrame) -> Result<DataFrame> {
    require_columns(df, &BALANCE_FIELDS)?;
    let out = df
        .clone()
        .lazy()
        .select([
            col(DATE_COL),
            col("CashAndCashEquivalents").alias("Cash"),
            col("TotalDebt"),
        ])
        .filter(all_present(&["Cash", "TotalDebt"]))
        .with_columns([safe_div(col("TotalDebt"), col("Cash")).alias("DebtToCash")])
        .filter(all_present(&["Cash", "TotalDebt", "DebtToCash"]))
        .collect()?;
    Ok(out)
}

/// Combines the three raw statements into one normalized metric table.
///
/// Runs the extractors, inner-joins their outputs on the date column,
/// computes the margin ratios against revenue, humanizes every column name
/// and sorts ascending by date.
///
/// The margins are dimensionless fractions (0.35 for 35%), not percentages;
/// display scaling and rounding are left to the caller. A zero or null
/// revenue yields a null margin on that row rather than an error.
pub fn build_fundamentals(
    income_stmt: &DataFrame,
    cashflow_stmt: &DataFrame,
    balance_sheet: &DataFrame,
) -> Result<DataFrame> {
    let inc = extract_income_metrics(income_stmt)?;
    let cf = extract_cashflow_metrics(cashflow_stmt)?;
    let bs = extract_balance_metrics(balance_sheet)?;

    let merged = inc
        .lazy()
        .join(
            cf.lazy(),
            [col(DATE_COL)],
            [col(DATE_COL)],
            JoinArgs::new(JoinType::Inner),
        )
        .join(
            bs.lazy(),
            [col(DATE_COL)],
            [col(DATE_COL)],
            JoinArgs::new(JoinType::Inner),
        )
        .with_columns([
            safe_div(col("GrossProfit"), col("TotalRevenue")).alias("GrossMargin"),
            safe_div(col("OperatingIncome"), col("TotalRevenue")).alias("OperatingMargin"),
            safe_div(col("NetIncome"), col("TotalRevenue")).alias("NetMargin"),
            safe_div(col("FreeCashFlow"), col("TotalRevenue")).alias("FreeCashFlowMargin"),
        ])
        .sort([DATE_COL], SortMultipleOptions::default())
        .collect()?;

    let renames: Vec<Expr> = merged
        .get_column_names()
        .iter()
        .map(|name| col(name.as_str()).alias(humanize(name.as_str())))
        .collect();
    let out = merged.lazy().select(renames).collect()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use stocks_core::error::StocksError;
    use stocks_core::frame::date_column;

    fn dates(years: &[i32]) -> Vec<NaiveDate> {
        years
            .iter()
            .map(|&y| NaiveDate::from_ymd_opt(y, 12, 31).unwrap())
            .collect()
    }

    fn income_frame(years: &[i32]) -> DataFrame {
        let n = years.len();
        DataFrame::new(vec![
            date_column(DATE_COL, &dates(years)).unwrap(),
            Column::new("TotalRevenue".into(), vec![Some(1000.0); n]),
            Column::new("GrossProfit".into(), vec![Some(400.0); n]),
            Column::new("OperatingIncome".into(), vec![Some(300.0); n]),
            Column::new("NetIncome".into(), vec![Some(250.0); n]),
        ])
        .unwrap()
    }

    fn cashflow_frame(years: &[i32]) -> DataFrame {
        let n = years.len();
        DataFrame::new(vec![
            date_column(DATE_COL, &dates(years)).unwrap(),
            Column::new("FreeCashFlow".into(), vec![Some(200.0); n]),
            Column::new("CapitalExpenditure".into(), vec![Some(-500.0); n]),
            Column::new("StockBasedCompensation".into(), vec![Some(50.0); n]),
        ])
        .unwrap()
    }

    fn balance_frame(years: &[i32]) -> DataFrame {
        let n = years.len();
        DataFrame::new(vec![
            date_column(DATE_COL, &dates(years)).unwrap(),
            Column::new("CashAndCashEquivalents".into(), vec![Some(100.0); n]),
            Column::new("TotalDebt".into(), vec![Some(300.0); n]),
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
    fn test_income_drops_incomplete_rows() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(&[2022, 2023])).unwrap(),
            Column::new("TotalRevenue".into(), [Some(1000.0), Some(1100.0)]),
            Column::new("GrossProfit".into(), [Some(400.0), None]),
            Column::new("OperatingIncome".into(), [Some(300.0), Some(310.0)]),
            Column::new("NetIncome".into(), [Some(250.0), Some(260.0)]),
        ])
        .unwrap();
        let out = extract_income_metrics(&df).unwrap();
        assert_eq!(out.height(), 1);
        assert_relative_eq!(f64_at(&out, "TotalRevenue", 0).unwrap(), 1000.0);
    }

    #[test]
    fn test_income_missing_column_is_fatal() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(&[2023])).unwrap(),
            Column::new("TotalRevenue".into(), [1000.0]),
        ])
        .unwrap();
        let err = extract_income_metrics(&df).unwrap_err();
        assert!(matches!(err, StocksError::MissingField { field } if field == "GrossProfit"));
    }

    #[test]
    fn test_capex_sign_normalized() {
        let out = extract_cashflow_metrics(&cashflow_frame(&[2023])).unwrap();
        assert_relative_eq!(f64_at(&out, "CapitalExpenditure", 0).unwrap(), 500.0);
    }

    #[test]
    fn test_cashflow_null_rows_dropped() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(&[2022, 2023])).unwrap(),
            Column::new("FreeCashFlow".into(), [Some(200.0), Some(210.0)]),
            Column::new("CapitalExpenditure".into(), [None, Some(-500.0)]),
            Column::new("StockBasedCompensation".into(), [Some(50.0), Some(55.0)]),
        ])
        .unwrap();
        let out = extract_cashflow_metrics(&df).unwrap();
        assert_eq!(out.height(), 1);
        assert_relative_eq!(f64_at(&out, "CapitalExpenditure", 0).unwrap(), 500.0);
    }

    #[test]
    fn test_balance_leverage_ratio() {
        let out = extract_balance_metrics(&balance_frame(&[2023])).unwrap();
        assert_relative_eq!(f64_at(&out, "Cash", 0).unwrap(), 100.0);
        assert_relative_eq!(f64_at(&out, "DebtToCash", 0).unwrap(), 3.0);
    }

    #[test]
    fn test_balance_zero_cash_row_dropped() {
        let df = DataFrame::new(vec![
            date_column(DATE_COL, &dates(&[2022, 2023])).unwrap(),
            Column::new("CashAndCashEquivalents".into(), [Some(0.0), Some(100.0)]),
            Column::new("TotalDebt".into(), [Some(300.0), Some(300.0)]),
        ])
        .unwrap();
        let out = extract_balance_metrics(&df).unwrap();
        assert_eq!(out.height(), 1);
        assert_relative_eq!(f64_at(&out, "DebtToCash", 0).unwrap(), 3.0);
    }

    #[test]
    fn test_margins_exact() {
        let out = build_fundamentals(
            &income_frame(&[2023]),
            &cashflow_frame(&[2023]),
            &balance_frame(&[2023]),
        )
        .unwrap();
        assert_relative_eq!(f64_at(&out, "Gross Margin", 0).unwrap(), 0.4);
        assert_relative_eq!(f64_at(&out, "Operating Margin", 0).unwrap(), 0.3);
        assert_relative_eq!(f64_at(&out, "Net Margin", 0).unwrap(), 0.25);
        assert_relative_eq!(f64_at(&out, "Free Cash Flow Margin", 0).unwrap(), 0.2);
    }

    #[test]
    fn test_inner_join_row_loss() {
        let out = build_fundamentals(
            &income_frame(&[2021, 2022, 2023]),
            &cashflow_frame(&[2022, 2023]),
            &balance_frame(&[2021, 2022, 2023]),
        )
        .unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_columns_humanized_and_ordered() {
        let out = build_fundamentals(
            &income_frame(&[2023]),
            &cashflow_frame(&[2023]),
            &balance_frame(&[2023]),
        )
        .unwrap();
        let names: Vec<String> = out
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Date",
                "Total Revenue",
                "Gross Profit",
                "Operating Income",
                "Net Income",
                "Free Cash Flow",
                "Capital Expenditure",
                "Stock Based Compensation",
                "Cash",
                "Total Debt",
                "Debt To Cash",
                "Gross Margin",
                "Operating Margin",
                "Net Margin",
                "Free Cash Flow Margin",
            ]
        );
    }

    #[test]
    fn test_sorted_ascending_by_date() {
        let out = build_fundamentals(
            &income_frame(&[2023, 2021, 2022]),
            &cashflow_frame(&[2021, 2022, 2023]),
            &balance_frame(&[2022, 2023, 2021]),
        )
        .unwrap();
        let years: Vec<i32> = out
            .column(DATE_COL)
            .unwrap()
            .as_materialized_series()
            .date()
            .unwrap()
            .into_iter()
            .map(|d| d.unwrap())
            .collect();
        let mut sorted = years.clone();
        sorted.sort_unstable();
        assert_eq!(years, sorted);
    }
}
