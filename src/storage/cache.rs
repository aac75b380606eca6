//! Time-bounded result cache keyed by URL.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, de::DeserializeOwned, de::IgnoredAny};

use crate::error::Result;
use crate::models::CacheEntry;
use crate::storage::LocalStorage;
use crate::utils::url_key;

/// Counts over the cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub bytes: u64,
}

/// Caches one payload per URL under `<dir>/<url_key>.json`.
///
/// An entry is fresh while `now - stored_at < ttl`. Unreadable entries are
/// reported as absent rather than failing the caller.
#[derive(Debug, Clone)]
pub struct ResultCache {
    storage: LocalStorage,
    ttl: Duration,
}

impl ResultCache {
    /// A TTL beyond what `chrono` can represent is clamped to its maximum.
    pub fn new(dir: impl Into<PathBuf>, ttl_hours: u64) -> Self {
        let ttl = i64::try_from(ttl_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        Self {
            storage: LocalStorage::new(dir),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(url: &str) -> String {
        format!("{}.json", url_key(url))
    }

    /// Store `payload` for `url`, replacing any previous entry.
    pub async fn put<T: Serialize + Sync + ?Sized>(&self, url: &str, payload: &T) -> Result<()> {
        self.put_at(url, payload, Utc::now()).await
    }

    async fn put_at<T: Serialize + Sync + ?Sized>(
        &self,
        url: &str,
        payload: &T,
        stored_at: DateTime<Utc>,
    ) -> Result<()> {
        let entry = CacheEntry::new(url, payload, stored_at);
        self.storage.write_json(&Self::key(url), &entry).await
    }

    /// Whether a fresh entry exists for `url`.
    pub async fn exists(&self, url: &str) -> bool {
        self.exists_at(url, Utc::now()).await
    }

    pub async fn exists_at(&self, url: &str, now: DateTime<Utc>) -> bool {
        self.read_entry::<IgnoredAny>(url)
            .await
            .is_some_and(|entry| entry.is_fresh(self.ttl, now))
    }

    /// The fresh payload for `url`, if any.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        self.get_at(url, Utc::now()).await
    }

    pub async fn get_at<T: DeserializeOwned>(&self, url: &str, now: DateTime<Utc>) -> Option<T> {
        self.read_entry::<T>(url)
            .await
            .filter(|entry| entry.is_fresh(self.ttl, now))
            .map(|entry| entry.content)
    }

    async fn read_entry<T: DeserializeOwned>(&self, url: &str) -> Option<CacheEntry<T>> {
        match self.storage.read_json(&Self::key(url)).await {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry for {}: {}", url, e);
                None
            }
        }
    }

    /// Walk the cache directory and classify every entry.
    pub async fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now();
        let mut stats = CacheStats::default();

        for (key, size) in self.storage.list_json().await? {
            stats.total += 1;
            stats.bytes += size;

            let fresh = matches!(
                self.storage.read_json::<CacheEntry<IgnoredAny>>(&key).await,
                Ok(Some(entry)) if entry.is_fresh(self.ttl, now)
            );
            if fresh {
                stats.valid += 1;
            } else {
                stats.expired += 1;
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        text: String,
        pages: u32,
    }

    fn payload(text: &str) -> Payload {
        Payload {
            text: text.to_string(),
            pages: 3,
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let tmp = TempDir::new().unwrap();
        let cache = ResultCache::new(tmp.path(), 24);
        let url = "https://example.com/edital.pdf";

        cache.put_at(url, &payload("a"), noon()).await.unwrap();

        let almost = noon() + Duration::hours(23) + Duration::minutes(59);
        let past = noon() + Duration::hours(24) + Duration::minutes(1);
        assert!(cache.exists_at(url, almost).await);
        assert_eq!(cache.get_at::<Payload>(url, almost).await, Some(payload("a")));
        assert!(!cache.exists_at(url, past).await);
        assert_eq!(cache.get_at::<Payload>(url, past).await, None);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_clamped() {
        let tmp = TempDir::new().unwrap();
        for hours in [3_000_000_000_000, u64::MAX] {
            let cache = ResultCache::new(tmp.path(), hours);
            assert_eq!(cache.ttl(), Duration::MAX);
        }

        let cache = ResultCache::new(tmp.path(), u64::MAX);
        let url = "https://example.com/edital.pdf";
        cache.put_at(url, &payload("a"), noon()).await.unwrap();
        let decade = noon() + Duration::days(3650);
        assert_eq!(cache.get_at::<Payload>(url, decade).await, Some(payload("a")));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_latest() {
        let tmp = TempDir::new().unwrap();
        let cache = ResultCache::new(tmp.path(), 24);
        let url = "https://example.com/edital.pdf";

        cache.put(url, &payload("first")).await.unwrap();
        cache.put(url, &payload("second")).await.unwrap();

        assert_eq!(cache.get::<Payload>(url).await, Some(payload("second")));
        assert_eq!(cache.stats().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_entries_are_absent() {
        let tmp = TempDir::new().unwrap();
        let cache = ResultCache::new(tmp.path(), 24);
        let url = "https://example.com/broken";

        assert!(!cache.exists(url).await);

        cache
            .storage
            .write_bytes(&ResultCache::key(url), b"{\"url\": ")
            .await
            .unwrap();
        assert!(!cache.exists(url).await);
        assert_eq!(cache.get::<Payload>(url).await, None);
    }

    #[tokio::test]
    async fn test_content_written_verbatim() {
        let tmp = TempDir::new().unwrap();
        let cache = ResultCache::new(tmp.path(), 24);
        let url = "https://example.com/x";

        cache.put_at(url, &payload("x"), noon()).await.unwrap();
        let raw: serde_json::Value = cache
            .storage
            .read_json(&ResultCache::key(url))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw["url"], url);
        assert_eq!(raw["content"]["text"], "x");
        assert_eq!(raw["timestamp"], "2025-10-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_stats_classify_entries() {
        let tmp = TempDir::new().unwrap();
        let cache = ResultCache::new(tmp.path(), 24);

        cache.put("https://a", &payload("a")).await.unwrap();
        cache
            .put_at("https://b", &payload("b"), Utc::now() - Duration::hours(48))
            .await
            .unwrap();
        cache
            .storage
            .write_bytes("garbage.json", b"nope")
            .await
            .unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.expired, 2);
        assert!(stats.bytes > 0);
    }
}
