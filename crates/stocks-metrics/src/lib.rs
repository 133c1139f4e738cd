#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stocks/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Metric derivation over raw financial statement tables.
//!
//! The transformations in this crate are pure functions over polars
//! `DataFrame`s:
//!
//! - [`fundamentals`] - statement extractors and the fundamentals builder
//! - [`valuation`] - valuation ratio table builder
//! - [`growth`] - period-over-period growth engine and [`growth::cagr`]
//! - [`dividend`] - dividend yield and dividend growth series
//!
//! Missing individual values propagate as nulls and are removed by each
//! builder's row-drop rules; a required column absent from an input table is
//! a fatal [`StocksError::MissingField`](stocks_core::StocksError).

/// Derived dividend series.
pub mod dividend;
/// Statement metric extraction and the fundamentals builder.
pub mod fundamentals;
/// Period-over-period growth computation.
pub mod growth;
/// Valuation ratio table builder.
pub mod valuation;

pub use dividend::{dividend_growth, dividend_yield_history};
pub use fundamentals::{
    build_fundamentals, extract_balance_metrics, extract_cashflow_metrics, extract_income_metrics,
};
pub use growth::{MetricUnit, cagr, compute_growth};
pub use valuation::build_valuation;
