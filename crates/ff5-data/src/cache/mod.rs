//! Caching layer for acquired data.

pub mod sqlite;

pub use sqlite::{AcquisitionCache, AcquisitionKey, CacheStats, CachedPayload};
