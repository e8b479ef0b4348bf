#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ff5/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod cached;
pub mod error;
pub mod french;
pub mod manual;
pub mod retry;
pub mod source;
pub mod yahoo;

pub use cache::{AcquisitionCache, AcquisitionKey, CacheStats};
pub use cached::{CachePolicy, CachedFactorSource, CachedPriceSource, SharedCache};
pub use error::{DataError, Result};
pub use french::{
    FactorFile, FactorTable, FrenchLibraryClient, FrenchLibraryConfig, parse_factor_csv,
};
pub use manual::{ManualEntryBuilder, ManualRow, ManualSeries};
pub use retry::{RetryPolicy, RetryingSource};
pub use source::{DateRange, FactorTableSource, Frequency, PriceHistorySource};
pub use yahoo::YahooQuoteProvider;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
