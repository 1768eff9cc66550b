//! Cache metadata model

use serde::{Deserialize, Serialize};

/// Which store a cached record was last reconciled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Local,
    Cloud,
    Merged,
}

/// Bookkeeping attached to a cached record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the cached data was last written (Unix ms)
    pub last_updated: i64,
    /// When the cached data was last reconciled with the remote store (Unix ms)
    pub last_synced: i64,
    /// Monotonic version counter, bumped on every write
    pub version: u64,
    /// Explicit staleness override set by cache policy
    pub is_stale: bool,
    /// Which side produced the cached data
    pub source: DataSource,
}

impl CacheMetadata {
    /// Create metadata for data freshly written from the given source
    #[must_use]
    pub fn fresh(source: DataSource) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            last_updated: now,
            last_synced: now,
            version: 1,
            is_stale: false,
            source,
        }
    }

    /// Record a local write, bumping the version counter
    pub fn touch(&mut self) {
        self.last_updated = chrono::Utc::now().timestamp_millis();
        self.version += 1;
        self.source = DataSource::Local;
    }

    /// Age of the cached data in milliseconds, relative to `now_ms`
    #[must_use]
    pub const fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.last_updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_metadata() {
        let meta = CacheMetadata::fresh(DataSource::Cloud);
        assert_eq!(meta.version, 1);
        assert!(!meta.is_stale);
        assert_eq!(meta.source, DataSource::Cloud);
    }

    #[test]
    fn test_touch_bumps_version_and_source() {
        let mut meta = CacheMetadata::fresh(DataSource::Cloud);
        meta.touch();
        assert_eq!(meta.version, 2);
        assert_eq!(meta.source, DataSource::Local);
    }

    #[test]
    fn test_age() {
        let mut meta = CacheMetadata::fresh(DataSource::Local);
        meta.last_updated = 1_000;
        assert_eq!(meta.age_ms(6_000), 5_000);
    }
}
