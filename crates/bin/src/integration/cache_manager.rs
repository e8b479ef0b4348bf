//! Location and maintenance of the acquisition cache.

use ff5_data::{AcquisitionCache, CacheStats, DataError};
use std::path::{Path, PathBuf};

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/ff5/`
/// - macOS: `~/Library/Caches/ff5/`
/// - Windows: `%LOCALAPPDATA%\ff5\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join("ff5")
}

/// Get the default cache database path.
pub(crate) fn default_cache_path() -> PathBuf {
    default_cache_dir().join("ff5.db")
}

/// The `--cache-path` override, or the default location.
pub(crate) fn resolve_cache_path(override_path: Option<&Path>) -> PathBuf {
    override_path.map_or_else(default_cache_path, Path::to_path_buf)
}

/// Open the cache, creating the directory if needed.
pub(crate) fn open_cache(path: &Path) -> Result<AcquisitionCache, DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    AcquisitionCache::new(path)
}

/// Human-readable cache statistics.
pub(crate) fn format_stats(path: &Path, stats: &CacheStats) -> String {
    let timestamp = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    };
    format!(
        concat!(
            "Cache: {}\n",
            "  Entries:  {}\n",
            "  Sources:  {}\n",
            "  Payload:  {:.1} KiB\n",
            "  Oldest:   {}\n",
            "  Newest:   {}\n",
        ),
        path.display(),
        stats.entries,
        stats.sources,
        stats.payload_bytes as f64 / 1024.0,
        timestamp(stats.oldest),
        timestamp(stats.newest),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_default() {
        let custom = Path::new("/tmp/custom.db");
        assert_eq!(resolve_cache_path(Some(custom)), custom);
        assert!(resolve_cache_path(None).ends_with("ff5/ff5.db"));
    }

    #[test]
    fn opens_cache_in_new_directory() {
        let dir = std::env::temp_dir().join(format!("ff5-cache-test-{}", std::process::id()));
        let path = dir.join("nested").join("ff5.db");

        let cache = open_cache(&path).unwrap();
        assert_eq!(cache.get_stats().unwrap().entries, 0);
        drop(cache);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn stats_render_empty_cache() {
        let text = format_stats(Path::new("ff5.db"), &CacheStats::default());
        assert!(text.contains("Entries:  0"));
        assert!(text.contains("Oldest:   -"));
    }
}
