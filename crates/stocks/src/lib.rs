#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stocks/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Per-symbol financial metric pipeline.
//!
//! This crate ties the workspace together: it re-exports the core types and
//! the metric builders, and provides the [`Stock`] handle that binds one
//! symbol to one provider with lazy, memoized accessors.
//!
//! # Features
//!
//! - `yahoo` (default) - Yahoo Finance retrieval layer
//!
//! # Example
//!
//! ```rust,ignore
//! use stocks::{StatementFrequency, Stock};
//!
//! #[tokio::main]
//! async fn main() -> stocks::Result<()> {
//!     let stock = Stock::yahoo("AAPL");
//!
//!     let fundamentals = stock.fundamentals(StatementFrequency::Annual).await?;
//!     let valuation = stock.ttm_valuation().await?;
//!     println!("{fundamentals}\n{valuation}");
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use stocks_core::*;

// Metric builders
pub use stocks_metrics::{
    build_fundamentals, build_valuation, cagr, compute_growth, dividend_growth,
    dividend_yield_history,
};

// Providers
#[cfg(feature = "yahoo")]
pub use stocks_yahoo::YahooProvider;

mod memo;
mod stock;

pub use stock::Stock;
