//! Quote data fetching from Yahoo Finance.

use crate::error::{DataError, Result};
use crate::source::{DateRange, PriceHistorySource};
use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use yahoo_finance_api as yahoo;

/// Source identifier used in cache keys.
pub const YAHOO_SOURCE_ID: &str = "yahoo";

/// Yahoo Finance quote provider with rate limiting.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a new Yahoo Finance quote provider with default rate limiting (1 req/sec).
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(1000))
    }

    /// Create a new Yahoo Finance quote provider with custom rate limiting.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
        })
    }

    /// Fetch daily closes for a single symbol.
    ///
    /// # Returns
    /// A Polars DataFrame with columns: date, close, adjusted_close
    pub async fn fetch_quotes(&self, symbol: &str, range: DateRange) -> Result<DataFrame> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let start_time = to_offset_datetime(range.start(), NaiveTime::MIN)?;
        // Include the whole last day.
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let end_time = to_offset_datetime(range.end(), last_second)?;

        debug!(symbol, %range, "requesting Yahoo Finance quote history");
        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await
            .map_err(|e| DataError::from_yahoo(symbol, e))?;

        let quotes = response.quotes().map_err(|e| DataError::from_yahoo(symbol, e))?;

        if quotes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }

        let timestamps: Vec<i64> = quotes.iter().map(|q| q.timestamp).collect();
        let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
        let adj_closes: Vec<f64> = quotes.iter().map(|q| q.adjclose).collect();

        let df = DataFrame::new(vec![
            Series::new("timestamp".into(), timestamps).into(),
            Series::new("close".into(), closes).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        // Convert timestamp to date
        let df = df
            .lazy()
            .with_column(
                (col("timestamp") * lit(1_000_000_000))
                    .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                    .cast(DataType::Date)
                    .alias("date"),
            )
            .select(&[col("date"), col("close"), col("adjusted_close")])
            .sort(["date"], SortMultipleOptions::default())
            .collect()?;

        info!(symbol, rows = df.height(), "fetched quote history");

        // Apply rate limiting
        sleep(self.rate_limit_delay).await;

        Ok(df)
    }
}

impl PriceHistorySource for YahooQuoteProvider {
    fn source_id(&self) -> &str {
        YAHOO_SOURCE_ID
    }

    async fn fetch_prices(&self, symbol: &str, range: DateRange) -> Result<DataFrame> {
        self.fetch_quotes(symbol, range).await
    }
}

fn to_offset_datetime(date: NaiveDate, time: NaiveTime) -> Result<time::OffsetDateTime> {
    let ts = date.and_time(time).and_utc().timestamp();
    time::OffsetDateTime::from_unix_timestamp(ts)
        .map_err(|e| DataError::TimeConversion(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(days: i64) -> DateRange {
        let end = chrono::Utc::now().date_naive();
        DateRange::new(end - chrono::Duration::days(days), end).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_quotes() {
        let provider = YahooQuoteProvider::new().unwrap();
        let df = provider.fetch_quotes("AAPL", range(30)).await.unwrap();

        assert!(df.height() > 0);
        assert_eq!(df.get_column_names(), vec!["date", "close", "adjusted_close"]);
    }

    #[tokio::test]
    async fn test_invalid_symbol() {
        let provider = YahooQuoteProvider::with_rate_limit(Duration::ZERO).unwrap();
        let result = provider.fetch_quotes("  ", range(30)).await;
        assert!(matches!(result, Err(DataError::InvalidSymbol(_))));
    }

    #[test]
    fn converts_dates_to_unix_time() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let odt = to_offset_datetime(date, NaiveTime::MIN).unwrap();
        assert_eq!(odt.unix_timestamp(), 1_704_153_600);
    }
}
