//! Source wrappers that memoize payloads in an [`AcquisitionCache`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{AcquisitionCache, AcquisitionKey, CachedPayload};
use crate::error::{DataError, Result};
use crate::source::{DateRange, FactorTableSource, Frequency, PriceHistorySource};
use crate::yahoo::{PricePoint, price_points, prices_frame};

/// Cache handle shared by several wrapped sources.
pub type SharedCache = Arc<Mutex<AcquisitionCache>>;

/// How a wrapped source consults the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Entries older than this are misses (default: 24 hours)
    pub ttl: Duration,
    /// Skip lookups and always refetch, still storing the result
    pub force_refresh: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            force_refresh: false,
        }
    }
}

/// Wrap an [`AcquisitionCache`] for sharing between sources.
pub fn shared(cache: AcquisitionCache) -> SharedCache {
    Arc::new(Mutex::new(cache))
}

fn lookup(cache: &SharedCache, key: &AcquisitionKey, policy: CachePolicy) -> Option<CachedPayload> {
    if policy.force_refresh {
        return None;
    }
    let guard = match cache.lock() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("cache lock poisoned; bypassing cache");
            return None;
        }
    };
    match guard.get_fresh(key, policy.ttl) {
        Ok(hit) => {
            debug!(source = %key.source, hit = hit.is_some(), "cache lookup");
            hit
        }
        Err(e) => {
            warn!(source = %key.source, error = %e, "cache lookup failed; refetching");
            None
        }
    }
}

fn store(cache: &SharedCache, key: &AcquisitionKey, payload: &str) {
    let result = cache
        .lock()
        .map_err(|_| DataError::Cache("cache lock poisoned".to_string()))
        .and_then(|guard| guard.put(key, payload));
    if let Err(e) = result {
        warn!(source = %key.source, error = %e, "failed to store payload in cache");
    }
}

/// A [`PriceHistorySource`] backed by the cache.
///
/// Payloads are stored as `date,adjusted_close` CSV keyed by
/// `(source:SYMBOL, start, end)`.
#[derive(Debug)]
pub struct CachedPriceSource<S> {
    inner: S,
    cache: SharedCache,
    policy: CachePolicy,
}

impl<S: PriceHistorySource> CachedPriceSource<S> {
    /// Wrap `inner`.
    pub const fn new(inner: S, cache: SharedCache, policy: CachePolicy) -> Self {
        Self {
            inner,
            cache,
            policy,
        }
    }

    /// The wrapped source.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    fn key(&self, symbol: &str, range: DateRange) -> AcquisitionKey {
        AcquisitionKey::ranged(
            format!("{}:{}", self.inner.source_id(), symbol.trim().to_ascii_uppercase()),
            range.start(),
            range.end(),
        )
    }
}

impl<S: PriceHistorySource> PriceHistorySource for CachedPriceSource<S> {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch_prices(&self, symbol: &str, range: DateRange) -> Result<DataFrame> {
        let key = self.key(symbol, range);

        if let Some(hit) = lookup(&self.cache, &key, self.policy) {
            match prices_from_csv(&hit.payload) {
                Ok(df) => return Ok(df),
                Err(e) => {
                    warn!(source = %key.source, error = %e, "discarding unreadable cache entry");
                }
            }
        }

        let df = self.inner.fetch_prices(symbol, range).await?;
        store(&self.cache, &key, &prices_to_csv(&df)?);
        Ok(df)
    }
}

/// A [`FactorTableSource`] backed by the cache.
///
/// Payloads are the dataset's native CSV keyed by the dataset id.
#[derive(Debug)]
pub struct CachedFactorSource<S> {
    inner: S,
    cache: SharedCache,
    policy: CachePolicy,
}

impl<S: FactorTableSource> CachedFactorSource<S> {
    /// Wrap `inner`.
    pub const fn new(inner: S, cache: SharedCache, policy: CachePolicy) -> Self {
        Self {
            inner,
            cache,
            policy,
        }
    }
}

impl<S: FactorTableSource> FactorTableSource for CachedFactorSource<S> {
    fn dataset_id(&self, frequency: Frequency) -> String {
        self.inner.dataset_id(frequency)
    }

    async fn fetch_factor_csv(&self, frequency: Frequency) -> Result<String> {
        let key = AcquisitionKey::whole(self.inner.dataset_id(frequency));

        if let Some(hit) = lookup(&self.cache, &key, self.policy) {
            return Ok(hit.payload);
        }

        let text = self.inner.fetch_factor_csv(frequency).await?;
        store(&self.cache, &key, &text);
        Ok(text)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PriceRecord {
    date: NaiveDate,
    adjusted_close: f64,
}

/// Serialize a price frame as `date,adjusted_close` CSV.
pub fn prices_to_csv(df: &DataFrame) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for PricePoint { date, close } in price_points(df)? {
        writer.serialize(PriceRecord {
            date,
            adjusted_close: close,
        })?;
    }
    let bytes = writer.into_inner().map_err(|e| DataError::Cache(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DataError::Cache(e.to_string()))
}

/// Parse `date,adjusted_close` CSV back into a price frame.
pub fn prices_from_csv(text: &str) -> Result<DataFrame> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let points = reader
        .deserialize::<PriceRecord>()
        .map(|record| record.map(|r| PricePoint {
            date: r.date,
            close: r.adjusted_close,
        }))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    prices_frame(&points)
}
