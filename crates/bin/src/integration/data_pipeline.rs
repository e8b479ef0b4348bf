//! Source assembly for the `fetch` command.
//!
//! Yahoo Finance and the French data library are wrapped in a timeout and
//! retry layer, and both are memoized in the SQLite cache unless caching is
//! disabled. A local factor file bypasses the library and the cache.

use super::cache_manager;
use chrono::NaiveDate;
use ff5::{Analysis, AnalysisOptions, FetchRequest, analyze_fetched};
use ff5_data::cached::shared;
use ff5_data::{
    CachePolicy, CachedFactorSource, CachedPriceSource, DataError, FactorFile, FrenchLibraryClient,
    FrenchLibraryConfig, RetryPolicy, RetryingSource, SharedCache, YahooQuoteProvider,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for data fetching.
#[derive(Debug, Clone)]
pub(crate) struct FetchConfig {
    /// Whether to use the cache.
    pub use_cache: bool,
    /// Whether to force refresh (ignore cached entries, still store new ones).
    pub force_refresh: bool,
    /// Age after which cached entries are refetched.
    pub ttl: Duration,
    /// Limit on each remote request.
    pub timeout: Duration,
    /// Retries for transient failures.
    pub retry: RetryPolicy,
    /// SQLite cache location.
    pub cache_path: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
            ttl: CachePolicy::default().ttl,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            cache_path: cache_manager::default_cache_path(),
        }
    }
}

impl FetchConfig {
    /// The cache policy the wrapped sources follow.
    pub(crate) const fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: self.ttl,
            force_refresh: self.force_refresh,
        }
    }

    /// Open the cache if enabled. An unusable cache disables caching for the run.
    fn open_cache(&self) -> Option<SharedCache> {
        if !self.use_cache {
            return None;
        }
        match cache_manager::open_cache(&self.cache_path) {
            Ok(cache) => Some(shared(cache)),
            Err(e) => {
                warn!(
                    path = %self.cache_path.display(),
                    error = %e,
                    "cache unavailable; fetching without it"
                );
                None
            }
        }
    }

    fn library(&self) -> Result<RetryingSource<FrenchLibraryClient>, DataError> {
        let client = FrenchLibraryClient::with_config(FrenchLibraryConfig {
            timeout: self.timeout,
            ..FrenchLibraryConfig::default()
        })?;
        Ok(RetryingSource::new(client, self.retry, self.timeout))
    }
}

/// Fetch prices and factors for `request`, then run the regression.
pub(crate) async fn fetch_and_analyze(
    request: &FetchRequest,
    factors_file: Option<&Path>,
    config: &FetchConfig,
    options: &AnalysisOptions,
) -> Result<Analysis<NaiveDate>, ff5::Error> {
    let prices = RetryingSource::new(YahooQuoteProvider::new()?, config.retry, config.timeout);
    let cache = config.open_cache();
    let policy = config.cache_policy();

    info!(
        symbol = %request.symbol,
        range = %request.range,
        frequency = %request.frequency,
        cached = cache.is_some(),
        "starting fetch"
    );

    match (cache, factors_file) {
        (Some(cache), Some(path)) => {
            let prices = CachedPriceSource::new(prices, cache, policy);
            analyze_fetched(&prices, &FactorFile::new(path), request, options).await
        }
        (Some(cache), None) => {
            let factors = CachedFactorSource::new(config.library()?, cache.clone(), policy);
            let prices = CachedPriceSource::new(prices, cache, policy);
            analyze_fetched(&prices, &factors, request, options).await
        }
        (None, Some(path)) => {
            analyze_fetched(&prices, &FactorFile::new(path), request, options).await
        }
        (None, None) => analyze_fetched(&prices, &config.library()?, request, options).await,
    }
}
