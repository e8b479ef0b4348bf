//! SQLite store for acquisition payloads.

use crate::error::{DataError, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::time::Duration;

/// Cache key: which source produced the payload, and for which range.
///
/// Whole-dataset downloads use empty bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcquisitionKey {
    /// Source identifier, e.g. `yahoo:AAPL` or `french:F-F_Research_Data_5_Factors_2x3`
    pub source: String,
    /// First day requested, if ranged
    pub start: Option<NaiveDate>,
    /// Last day requested, if ranged
    pub end: Option<NaiveDate>,
}

impl AcquisitionKey {
    /// Key for a date-ranged request.
    pub fn ranged(source: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            source: source.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// Key for a whole-dataset request.
    pub fn whole(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            start: None,
            end: None,
        }
    }

    fn bounds(&self) -> (String, String) {
        (
            self.start.map(|d| d.to_string()).unwrap_or_default(),
            self.end.map(|d| d.to_string()).unwrap_or_default(),
        )
    }
}

/// A cached payload with its fetch time.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPayload {
    /// Payload in the source's native CSV layout
    pub payload: String,
    /// When the payload was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedPayload {
    /// Whether the payload is older than `ttl` at `now`.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        chrono::Duration::from_std(ttl).is_ok_and(|ttl| now - self.fetched_at > ttl)
    }
}

/// SQLite cache of acquisition results.
#[derive(Debug)]
pub struct AcquisitionCache {
    conn: Connection,
}

impl AcquisitionCache {
    /// Create a new SQLite cache.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS acquisitions (
                source TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                payload TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (source, start_date, end_date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_acquisitions_fetched_at ON acquisitions(fetched_at)",
            [],
        )?;

        Ok(())
    }

    /// Look up a payload regardless of age.
    pub fn get(&self, key: &AcquisitionKey) -> Result<Option<CachedPayload>> {
        let (start, end) = key.bounds();
        let row = self
            .conn
            .query_row(
                "SELECT payload, fetched_at FROM acquisitions
                 WHERE source = ?1 AND start_date = ?2 AND end_date = ?3",
                params![key.source, start, end],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(payload, fetched_at)| {
            let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
                .map_err(|e| DataError::Cache(format!("bad fetched_at '{fetched_at}': {e}")))?
                .with_timezone(&Utc);
            Ok(CachedPayload {
                payload,
                fetched_at,
            })
        })
        .transpose()
    }

    /// Look up a payload no older than `ttl`.
    pub fn get_fresh(&self, key: &AcquisitionKey, ttl: Duration) -> Result<Option<CachedPayload>> {
        let now = Utc::now();
        Ok(self.get(key)?.filter(|entry| !entry.is_expired(ttl, now)))
    }

    /// Store a payload fetched now, replacing any previous entry.
    pub fn put(&self, key: &AcquisitionKey, payload: &str) -> Result<()> {
        self.put_at(key, payload, Utc::now())
    }

    /// Store a payload with an explicit fetch time.
    pub fn put_at(
        &self,
        key: &AcquisitionKey,
        payload: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let (start, end) = key.bounds();
        self.conn.execute(
            "INSERT OR REPLACE INTO acquisitions (source, start_date, end_date, payload, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key.source, start, end, payload, timestamp(fetched_at)],
        )?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM acquisitions", [])?)
    }

    /// Clear cached data for sources whose identifier equals `source` or
    /// starts with `source:`.
    pub fn clear_source(&self, source: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM acquisitions
             WHERE source = ?1 OR substr(source, 1, length(?1) + 1) = ?1 || ':'",
            params![source],
        )?)
    }

    /// Delete entries older than `ttl`.
    pub fn purge_expired(&self, ttl: Duration) -> Result<usize> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| DataError::Cache(e.to_string()))?;
        let cutoff = timestamp(Utc::now() - ttl);

        // Fixed-width UTC timestamps sort lexicographically.
        let tx = self.conn.unchecked_transaction()?;
        let removed =
            tx.execute("DELETE FROM acquisitions WHERE fetched_at < ?1", params![cutoff])?;
        tx.commit()?;
        Ok(removed)
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let entries: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM acquisitions", [], |row| row.get(0))?;

        let sources: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT source) FROM acquisitions", [], |row| row.get(0))?;

        let payload_bytes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(payload)), 0) FROM acquisitions",
            [],
            |row| row.get(0),
        )?;

        let (oldest, newest): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(fetched_at), MAX(fetched_at) FROM acquisitions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let parse = |s: Option<String>| {
            s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc))
        };

        Ok(CacheStats {
            entries: entries as usize,
            sources: sources as usize,
            payload_bytes: payload_bytes as usize,
            oldest: parse(oldest),
            newest: parse(newest),
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached payloads
    pub entries: usize,
    /// Number of distinct source identifiers
    pub sources: usize,
    /// Total payload size in bytes
    pub payload_bytes: usize,
    /// Fetch time of the oldest entry
    pub oldest: Option<DateTime<Utc>>,
    /// Fetch time of the newest entry
    pub newest: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_cache_initialization() {
        let cache = AcquisitionCache::in_memory();
        assert!(cache.is_ok());
    }

    #[test]
    fn test_put_and_get() {
        let cache = AcquisitionCache::in_memory().unwrap();
        let key = AcquisitionKey::ranged("yahoo:AAPL", d(2024, 1, 1), d(2024, 6, 30));

        assert!(cache.get(&key).unwrap().is_none());
        cache.put(&key, "date,adjusted_close\n2024-01-02,185.2\n").unwrap();

        let entry = cache.get_fresh(&key, HOUR).unwrap().unwrap();
        assert!(entry.payload.starts_with("date,adjusted_close"));

        // Different range is a different entry.
        let other = AcquisitionKey::ranged("yahoo:AAPL", d(2024, 1, 1), d(2024, 7, 31));
        assert!(cache.get(&other).unwrap().is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = AcquisitionCache::in_memory().unwrap();
        let key = AcquisitionKey::whole("french:F-F_Research_Data_5_Factors_2x3");
        cache.put_at(&key, "payload", Utc::now() - chrono::Duration::hours(30)).unwrap();

        assert!(cache.get(&key).unwrap().is_some());
        assert!(cache.get_fresh(&key, 24 * HOUR).unwrap().is_none());
        assert!(cache.get_fresh(&key, 48 * HOUR).unwrap().is_some());
    }

    #[test]
    fn test_put_replaces() {
        let cache = AcquisitionCache::in_memory().unwrap();
        let key = AcquisitionKey::whole("french:x");
        cache.put(&key, "old").unwrap();
        cache.put(&key, "new").unwrap();
        assert_eq!(cache.get(&key).unwrap().unwrap().payload, "new");
        assert_eq!(cache.get_stats().unwrap().entries, 1);
    }

    #[test]
    fn test_clear_operations() {
        let cache = AcquisitionCache::in_memory().unwrap();
        let ranged = |source: &str| AcquisitionKey::ranged(source, d(2024, 1, 1), d(2024, 2, 1));
        cache.put(&ranged("yahoo:AAPL"), "a").unwrap();
        cache.put(&ranged("yahoo:MSFT"), "b").unwrap();
        cache.put(&AcquisitionKey::whole("yahooish"), "c").unwrap();
        cache.put(&AcquisitionKey::whole("french:x"), "d").unwrap();

        assert_eq!(cache.clear_source("yahoo:AAPL").unwrap(), 1);
        assert_eq!(cache.clear_source("yahoo").unwrap(), 1);
        assert_eq!(cache.get_stats().unwrap().entries, 2);

        assert_eq!(cache.clear_all().unwrap(), 2);
        assert_eq!(cache.get_stats().unwrap().entries, 0);
    }

    #[test]
    fn test_purge_expired() {
        let cache = AcquisitionCache::in_memory().unwrap();
        let three_days_ago = Utc::now() - chrono::Duration::days(3);
        cache.put_at(&AcquisitionKey::whole("old"), "x", three_days_ago).unwrap();
        cache.put(&AcquisitionKey::whole("new"), "y").unwrap();

        assert_eq!(cache.purge_expired(24 * HOUR).unwrap(), 1);
        assert!(cache.get(&AcquisitionKey::whole("new")).unwrap().is_some());
    }

    #[test]
    fn test_cache_stats() {
        let cache = AcquisitionCache::in_memory().unwrap();
        let empty = cache.get_stats().unwrap();
        assert_eq!(empty.entries, 0);
        assert!(empty.oldest.is_none());

        cache.put(&AcquisitionKey::whole("a"), "12345").unwrap();
        cache.put(&AcquisitionKey::ranged("b", d(2024, 1, 1), d(2024, 1, 31)), "678").unwrap();
        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.sources, 2);
        assert_eq!(stats.payload_bytes, 8);
        assert!(stats.oldest.unwrap() <= stats.newest.unwrap());
    }
}
