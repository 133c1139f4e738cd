//! Error types for data retrieval and metric derivation.
//!
//! This module defines [`StocksError`] which covers the failure modes of both
//! the retrieval layer (network, rate limits, unknown symbols) and the
//! derivation layer (schema mismatches with the upstream provider).
//!
//! Missing individual *values* are never errors: they flow through the
//! builders as nulls and are removed by each builder's row-drop rules.

use thiserror::Error;

/// Errors that can occur while fetching raw tables or deriving metrics.
#[derive(Error, Debug)]
pub enum StocksError {
    /// A required column is absent from an input table.
    ///
    /// This signals a schema mismatch with the upstream provider and is
    /// fatal; it is never retried and never papered over with nulls.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the absent column.
        field: String,
    },

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Data is not available for the requested symbol and date range.
    #[error("Data not available for {symbol} in range {start} to {end}")]
    DataNotAvailable {
        /// The symbol that was requested.
        symbol: String,
        /// Start of the requested date range.
        start: String,
        /// End of the requested date range.
        end: String,
    },

    /// Error parsing data from a provider.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error raised by a DataFrame operation.
    #[error("Frame error: {0}")]
    Frame(#[from] polars::error::PolarsError),
}

/// Result type alias using [`StocksError`].
pub type Result<T> = std::result::Result<T, StocksError>;
