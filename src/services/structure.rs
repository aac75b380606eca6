// src/services/structure.rs

//! Structure change detection.
//!
//! Compares the signature of a freshly fetched page against the last
//! structurally distinct signature stored for the same URL.

use crate::error::Result;
use crate::models::{
    ChangeReport, ElementCountChange, ElementKey, SignatureRecord, StructureConfig,
    StructureSignature, TagCounts,
};
use crate::storage::SignatureStore;

/// Detects layout drift per URL over a [`SignatureStore`].
pub struct StructureMonitor<S> {
    store: S,
    tracked: Vec<ElementKey>,
    critical: Vec<ElementKey>,
}

impl<S: SignatureStore> StructureMonitor<S> {
    pub fn new(store: S, tracked: Vec<ElementKey>, critical: Vec<ElementKey>) -> Self {
        Self {
            store,
            tracked,
            critical,
        }
    }

    pub fn from_config(store: S, config: &StructureConfig) -> Self {
        Self::new(store, config.tracked.clone(), config.critical.clone())
    }

    pub fn tracked(&self) -> &[ElementKey] {
        &self.tracked
    }

    /// Compare `current` with the stored signature for `url`.
    ///
    /// The stored record is written on the first visit and whenever a
    /// tracked count moved; an unchanged page leaves it untouched, so its
    /// timestamp marks the last actual layout change. Counts are projected
    /// onto the tracked keys before comparing and saving.
    pub async fn detect(&self, url: &str, current: &StructureSignature) -> Result<ChangeReport> {
        let current = current.aligned_to(&self.tracked);
        let Some(previous) = self.store.load_signature(url).await? else {
            log::info!("First visit to {}, storing structure signature", url);
            self.store
                .save_signature(&SignatureRecord::new(url, current))
                .await?;
            return Ok(ChangeReport::first_visit());
        };

        let report = self.compare(previous.signature.tag_counts(), &current);
        if report.has_changes() {
            log::info!(
                "{} tracked element count(s) changed on {} (critical: {})",
                report.changes.len(),
                url,
                report.critical
            );
            self.store
                .save_signature(&SignatureRecord::new(url, current))
                .await?;
        } else {
            log::debug!("No structural change on {}", url);
        }

        Ok(report)
    }

    fn compare(&self, previous: &TagCounts, current: &StructureSignature) -> ChangeReport {
        let changes: Vec<ElementCountChange> = self
            .tracked
            .iter()
            .filter_map(|key| {
                let previous_count = previous.get(key);
                let current_count = current.tag_counts().get(key);
                (previous_count != current_count).then(|| ElementCountChange {
                    element_key: key.clone(),
                    previous_count,
                    current_count,
                })
            })
            .collect();

        let critical = changes
            .iter()
            .any(|change| change.vanished() && self.critical.contains(&change.element_key));

        ChangeReport {
            first_seen: false,
            changes,
            critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use tempfile::TempDir;

    const URL: &str = "https://goias.gov.br/fapeg/categoria/editais/";

    fn key(s: &str) -> ElementKey {
        s.parse().unwrap()
    }

    fn tracked() -> Vec<ElementKey> {
        vec![
            key("article.tease"),
            key("h2.entry-title"),
            key("section.entry-content"),
            key("div.meta-date"),
        ]
    }

    fn critical() -> Vec<ElementKey> {
        vec![key("article.tease"), key("h2.entry-title")]
    }

    fn sig(counts: &[(&str, u32)]) -> StructureSignature {
        StructureSignature::from_counts(
            tracked()
                .into_iter()
                .map(|k| {
                    let count = counts
                        .iter()
                        .find(|(name, _)| *name == k.to_string())
                        .map_or(0, |(_, c)| *c);
                    (k, count)
                }),
        )
    }

    fn monitor(tmp: &TempDir) -> StructureMonitor<LocalStorage> {
        StructureMonitor::new(LocalStorage::new(tmp.path()), tracked(), critical())
    }

    #[tokio::test]
    async fn test_first_visit_then_no_change() {
        let tmp = TempDir::new().unwrap();
        let monitor = monitor(&tmp);
        let current = sig(&[("article.tease", 5), ("h2.entry-title", 5)]);

        let first = monitor.detect(URL, &current).await.unwrap();
        assert_eq!(first, ChangeReport::first_visit());

        let second = monitor.detect(URL, &current).await.unwrap();
        assert!(!second.first_seen);
        assert!(second.changes.is_empty());
        assert!(!second.critical);
    }

    #[tokio::test]
    async fn test_vanished_anchor_is_critical() {
        let tmp = TempDir::new().unwrap();
        let monitor = monitor(&tmp);

        monitor
            .detect(URL, &sig(&[("article.tease", 10), ("h2.entry-title", 10)]))
            .await
            .unwrap();
        let report = monitor
            .detect(URL, &sig(&[("article.tease", 0), ("h2.entry-title", 10)]))
            .await
            .unwrap();

        assert_eq!(
            report.changes,
            vec![ElementCountChange {
                element_key: key("article.tease"),
                previous_count: 10,
                current_count: 0,
            }]
        );
        assert!(report.critical);
    }

    #[tokio::test]
    async fn test_count_drift_is_not_critical() {
        let tmp = TempDir::new().unwrap();
        let monitor = monitor(&tmp);

        monitor.detect(URL, &sig(&[("article.tease", 10)])).await.unwrap();
        let report = monitor.detect(URL, &sig(&[("article.tease", 12)])).await.unwrap();

        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].previous_count, 10);
        assert_eq!(report.changes[0].current_count, 12);
        assert!(!report.critical);
    }

    #[tokio::test]
    async fn test_vanished_non_anchor_is_not_critical() {
        let tmp = TempDir::new().unwrap();
        let monitor = monitor(&tmp);

        monitor
            .detect(URL, &sig(&[("article.tease", 3), ("div.meta-date", 3)]))
            .await
            .unwrap();
        let report = monitor.detect(URL, &sig(&[("article.tease", 3)])).await.unwrap();

        assert_eq!(report.changes.len(), 1);
        assert!(report.changes[0].vanished());
        assert!(!report.critical);
    }

    #[tokio::test]
    async fn test_unchanged_page_keeps_record_timestamp() {
        let tmp = TempDir::new().unwrap();
        let monitor = monitor(&tmp);
        let store = LocalStorage::new(tmp.path());
        let current = sig(&[("article.tease", 4)]);

        monitor.detect(URL, &current).await.unwrap();
        let before = store.load_signature(URL).await.unwrap().unwrap();

        monitor.detect(URL, &current).await.unwrap();
        let after = store.load_signature(URL).await.unwrap().unwrap();

        assert_eq!(before.captured_at, after.captured_at);
    }

    #[tokio::test]
    async fn test_growth_updates_record() {
        let tmp = TempDir::new().unwrap();
        let monitor = monitor(&tmp);
        let store = LocalStorage::new(tmp.path());

        let first = monitor
            .detect(URL, &sig(&[("article.tease", 5), ("h2.entry-title", 5)]))
            .await
            .unwrap();
        assert!(first.first_seen);

        let grown = sig(&[("article.tease", 6), ("h2.entry-title", 6)]);
        let report = monitor.detect(URL, &grown).await.unwrap();
        assert_eq!(report.changes.len(), 2);
        assert_eq!(report.changes[0].element_key, key("article.tease"));
        assert_eq!(report.changes[1].element_key, key("h2.entry-title"));
        assert!(!report.critical);

        let stored = store.load_signature(URL).await.unwrap().unwrap();
        assert_eq!(stored.signature, grown);
    }

    #[tokio::test]
    async fn test_key_missing_from_old_record_counts_as_zero() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        store
            .save_signature(&SignatureRecord::new(
                URL,
                StructureSignature::from_counts(vec![(key("article.tease"), 2)]),
            ))
            .await
            .unwrap();

        let report = monitor(&tmp)
            .detect(URL, &sig(&[("article.tease", 2), ("div.meta-date", 2)]))
            .await
            .unwrap();
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].element_key, key("div.meta-date"));
        assert_eq!(report.changes[0].previous_count, 0);
    }

    #[tokio::test]
    async fn test_saved_record_holds_exactly_tracked_keys() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let monitor = StructureMonitor::new(
            LocalStorage::new(tmp.path()),
            vec![key("article.tease")],
            vec![key("article.tease")],
        );
        let foreign = StructureSignature::from_counts(vec![(key("div.extra"), 5)]);

        monitor.detect(URL, &foreign).await.unwrap();
        let stored = store.load_signature(URL).await.unwrap().unwrap();
        let keys: Vec<_> = stored.signature.tag_counts().keys().cloned().collect();
        assert_eq!(keys, vec![key("article.tease")]);
        assert_eq!(stored.signature.tag_counts().get(&key("article.tease")), 0);

        let grown = StructureSignature::from_counts(vec![
            (key("article.tease"), 3),
            (key("div.extra"), 9),
        ]);
        let report = monitor.detect(URL, &grown).await.unwrap();
        assert_eq!(report.changes.len(), 1);
        let stored = store.load_signature(URL).await.unwrap().unwrap();
        assert_eq!(stored.signature.tag_counts().len(), 1);
        assert_eq!(stored.signature.tag_counts().get(&key("article.tease")), 3);
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl SignatureStore for ReadOnlyStore {
        async fn load_signature(&self, _url: &str) -> Result<Option<SignatureRecord>> {
            Ok(None)
        }

        async fn save_signature(&self, _record: &SignatureRecord) -> Result<()> {
            Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[tokio::test]
    async fn test_save_failure_propagates() {
        let monitor = StructureMonitor::new(ReadOnlyStore, tracked(), critical());
        let result = monitor.detect(URL, &sig(&[("article.tease", 1)])).await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
