#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stocks/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and traits for the stock metric-derivation pipeline.
//!
//! This crate provides the foundational abstractions shared by the rest of
//! the workspace:
//!
//! - [`StatementProvider`](provider::StatementProvider) - retrieval-layer boundary
//! - [`StocksError`](error::StocksError) - error taxonomy
//! - [`humanize`](humanize::humanize) - field name humanization
//! - [`frame`] - table helpers used by every builder

/// Error types for retrieval and derivation.
pub mod error;
/// Table helpers shared by the metric builders.
pub mod frame;
/// Statement frequencies and price history intervals.
pub mod frequency;
/// Field name humanization.
pub mod humanize;
/// Provider trait for the raw data retrieval layer.
pub mod provider;
/// Core data types (Symbol, HistoryQuery, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{Result, StocksError};
pub use frame::DATE_COL;
pub use frequency::{Interval, StatementFrequency};
pub use humanize::humanize;
pub use provider::{SnapshotModule, StatementProvider};
pub use types::{HistoryQuery, HistoryUpdate, Symbol};
