//! Acquisition capabilities and the request types they share.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Sampling frequency of returns and factor data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One observation per trading day
    Daily,
    /// One observation per calendar month, keyed by the first of the month
    #[default]
    Monthly,
}

impl Frequency {
    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(Self::Daily),
            "monthly" | "m" => Ok(Self::Monthly),
            other => Err(DataError::Parse(format!("unknown frequency '{other}'"))),
        }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// First day of the range.
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// A provider of historical adjusted closing prices.
///
/// Implementations return a frame with a `date` column (`Date`) and an
/// `adjusted_close` column (`f64`), ascending by date.
pub trait PriceHistorySource {
    /// Stable identifier used as the cache key prefix.
    fn source_id(&self) -> &str;

    /// Fetch daily adjusted closes for `symbol` over `range`.
    fn fetch_prices(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> impl Future<Output = Result<DataFrame>>;
}

/// A provider of the published five-factor dataset.
///
/// Implementations return the dataset as CSV text in the library's native
/// layout; [`crate::french::parse_factor_csv`] turns it into a table.
pub trait FactorTableSource {
    /// Stable identifier of the dataset at `frequency`, used as the cache key.
    fn dataset_id(&self, frequency: Frequency) -> String;

    /// Fetch the whole dataset at `frequency`.
    fn fetch_factor_csv(&self, frequency: Frequency) -> impl Future<Output = Result<String>>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("daily", Frequency::Daily)]
    #[case("Monthly", Frequency::Monthly)]
    #[case(" m ", Frequency::Monthly)]
    fn parses_frequency(#[case] input: &str, #[case] expected: Frequency) {
        assert_eq!(input.parse::<Frequency>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_frequency() {
        assert!("weekly".parse::<Frequency>().is_err());
    }

    #[test]
    fn date_range_validation() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        let range = DateRange::new(a, b).unwrap();
        assert!(range.contains(a) && range.contains(b));
        assert!(!range.contains(b.succ_opt().unwrap()));
        assert_eq!(range.to_string(), "2024-01-01..=2024-06-30");

        assert!(matches!(DateRange::new(b, a), Err(DataError::InvalidDateRange { .. })));
    }
}
