//! Error types for data operations.

use std::time::Duration;

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while acquiring or validating input data.
#[derive(Debug, Error)]
pub enum DataError {
    /// Yahoo Finance API error
    #[error("Yahoo Finance API error: {0}")]
    YahooApi(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Status code returned by the server
        status: u16,
        /// Requested URL
        url: String,
    },

    /// A request did not complete in time
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// What was being fetched
        operation: String,
        /// Configured limit
        after: Duration,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// The remote payload does not have the expected layout
    #[error("Unexpected data layout: {0}")]
    Schema(String),

    /// Archive extraction error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Missing data
    #[error("Missing data for {symbol}: {reason}")]
    MissingData {
        /// Symbol or dataset that was queried
        symbol: String,
        /// Reason for missing data
        reason: String,
    },

    /// Invalid user-supplied value
    #[error("Invalid {field} in row {row}: {reason}")]
    Validation {
        /// One-based row (period) number
        row: usize,
        /// Column name
        field: String,
        /// What is wrong with the value
        reason: String,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Time conversion error
    #[error("Time conversion error: {0}")]
    TimeConversion(String),

    /// Invalid symbol
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Whether retrying the same request may succeed.
    ///
    /// Validation, schema, cache and missing-data errors are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } | Self::YahooApi(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Classify a Yahoo Finance failure for `symbol`.
    ///
    /// Empty results and API error payloads (unknown or delisted tickers)
    /// become [`DataError::MissingData`]; everything else stays a
    /// [`DataError::YahooApi`] and is retried.
    pub fn from_yahoo(symbol: &str, err: yahoo_finance_api::YahooError) -> Self {
        use yahoo_finance_api::YahooError;

        match err {
            YahooError::NoResult | YahooError::NoQuotes | YahooError::ApiError(_) => {
                Self::MissingData {
                    symbol: symbol.to_string(),
                    reason: err.to_string(),
                }
            }
            other => Self::YahooApi(other.to_string()),
        }
    }

    /// Shorthand for a [`DataError::Validation`].
    pub fn validation(row: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            row,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<yahoo_finance_api::YahooError> for DataError {
    fn from(err: yahoo_finance_api::YahooError) -> Self {
        Self::YahooApi(err.to_string())
    }
}
