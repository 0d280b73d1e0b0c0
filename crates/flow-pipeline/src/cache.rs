//! Result cache using moka
//!
//! Holds successful [`MetricsRecord`]s for a fixed time-to-live measured from
//! insertion. Concurrent requests for the same key share one computation.
//! Failed and partial computations are handed to every waiter of that flight
//! but never stored.

use crate::error::CycleError;
use crate::record::MetricsRecord;
use flow_client::{normalize_base_url, ProjectRef};
use flow_core::{PredicateSet, WorkflowVocabulary};
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Identity of a cached computation
///
/// Built from the backend, the project, a fingerprint of the login identity
/// and a fingerprint of the selection. The password itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    base_url: String,
    project: ProjectRef,
    credential: String,
    selection: String,
}

impl CacheKey {
    /// Build key
    #[must_use]
    pub fn new(
        base_url: &str,
        project: &ProjectRef,
        username: &str,
        password: &str,
        predicates: &PredicateSet,
        vocabulary: &WorkflowVocabulary,
    ) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            project: project.clone(),
            credential: credential_fingerprint(username, password),
            selection: selection_fingerprint(predicates, vocabulary),
        }
    }

    /// Hex SHA-256 of the login identity
    #[inline]
    #[must_use]
    pub fn credential_fingerprint(&self) -> &str {
        &self.credential
    }

    /// Hex SHA-256 of the filters and vocabulary
    #[inline]
    #[must_use]
    pub fn selection_fingerprint(&self) -> &str {
        &self.selection
    }
}

fn credential_fingerprint(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn selection_fingerprint(predicates: &PredicateSet, vocabulary: &WorkflowVocabulary) -> String {
    // BTreeSet fields serialize in sorted order, so equal selections hash equal
    let canonical = serde_json::to_vec(&(predicates, vocabulary)).unwrap_or_default();
    hex::encode(Sha256::digest(&canonical))
}

/// Outcome of a computation that is not stored
#[derive(Debug)]
enum Uncached {
    Partial(Arc<MetricsRecord>),
    Failed(Arc<CycleError>),
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// TTL cache of complete metrics records
#[derive(Debug, Clone)]
pub struct ResultCache {
    inner: Cache<CacheKey, Arc<MetricsRecord>>,
}

impl ResultCache {
    /// Create cache holding at most `max_capacity` records for `ttl`
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached record for `key`, if present and not expired
    #[inline]
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<MetricsRecord>> {
        self.inner.get(key).await
    }

    /// Return the cached record or run `compute` once for all concurrent callers
    ///
    /// # Errors
    /// Returns the shared error of the computation; it is not cached, so the
    /// next call computes again.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<Arc<MetricsRecord>, Arc<CycleError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MetricsRecord, CycleError>>,
    {
        let init = async move {
            match compute().await {
                Ok(record) if record.partial => Err(Uncached::Partial(Arc::new(record))),
                Ok(record) => Ok(Arc::new(record)),
                Err(e) => Err(Uncached::Failed(Arc::new(e))),
            }
        };

        match self.inner.try_get_with(key, init).await {
            Ok(record) => Ok(record),
            Err(uncached) => match uncached.as_ref() {
                Uncached::Partial(record) => Ok(record.clone()),
                Uncached::Failed(e) => Err(e.clone()),
            },
        }
    }

    /// Invalidate cache entry
    #[inline]
    pub async fn invalidate(&self, key: &CacheKey) {
        self.inner.invalidate(key).await;
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for ResultCache {
    /// Cache of 64 records for five minutes
    fn default() -> Self {
        Self::new(64, Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flow_client::ClientError;
    use flow_core::{MetricsEngine, ProjectSummary, StatusOrdinalMap};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(project: u64) -> CacheKey {
        CacheKey::new(
            "https://api.taiga.io",
            &ProjectRef::Id(project),
            "ana",
            "pw",
            &PredicateSet::default(),
            &WorkflowVocabulary::default(),
        )
    }

    fn record(partial: bool) -> MetricsRecord {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let vocabulary = WorkflowVocabulary::default();
        let ordinals = StatusOrdinalMap::new();
        MetricsRecord {
            project: ProjectSummary {
                id: 1,
                name: "p".into(),
                slug: None,
                description: String::new(),
            },
            filters: PredicateSet::default(),
            metrics: MetricsEngine::new(&vocabulary, &ordinals).compute(&[], &[], now),
            items: Vec::new(),
            milestones: Vec::new(),
            warnings: Vec::new(),
            data_quality: Vec::new(),
            partial,
        }
    }

    #[test]
    fn key_hides_password_and_normalizes_url() {
        let a = key(1);
        let b = CacheKey::new(
            "HTTPS://api.taiga.io/",
            &ProjectRef::Id(1),
            "ana",
            "pw",
            &PredicateSet::default(),
            &WorkflowVocabulary::default(),
        );
        assert_eq!(a, b);
        assert!(!format!("{a:?}").contains("pw\""));
        assert_eq!(a.credential_fingerprint().len(), 64);
    }

    #[test]
    fn key_changes_with_password_and_selection() {
        let base = key(1);
        let other_password = CacheKey::new(
            "https://api.taiga.io",
            &ProjectRef::Id(1),
            "ana",
            "other",
            &PredicateSet::default(),
            &WorkflowVocabulary::default(),
        );
        let filtered = CacheKey::new(
            "https://api.taiga.io",
            &ProjectRef::Id(1),
            "ana",
            "pw",
            &PredicateSet::new().with_statuses(["Done"]),
            &WorkflowVocabulary::default(),
        );
        assert_ne!(base, other_password);
        assert_ne!(base, filtered);
        assert_eq!(base.credential_fingerprint(), filtered.credential_fingerprint());
        assert_ne!(base, key(2));
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_computation() {
        let cache = ResultCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let compute = || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(record(false))
            }
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_compute(key(1), compute),
            cache.get_or_compute(key(1), compute),
            cache.get_or_compute(key(1), compute),
        );
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(c.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.get(&key(1)).await.is_some());
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = ResultCache::default();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_compute(key(1), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CycleError::Authentication(ClientError::MissingToken))
            })
            .await;
        assert!(matches!(first.unwrap_err().as_ref(), CycleError::Authentication(_)));

        let second = cache
            .get_or_compute(key(1), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(record(false))
            })
            .await;
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn partial_records_are_returned_but_not_cached() {
        let cache = ResultCache::default();
        let partial = cache
            .get_or_compute(key(1), || async { Ok(record(true)) })
            .await
            .unwrap();
        assert!(partial.partial);
        assert!(cache.get(&key(1)).await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = ResultCache::new(8, Duration::from_millis(100));
        let calls = AtomicUsize::new(0);
        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(record(false))
        };

        cache.get_or_compute(key(1), compute).await.unwrap();
        cache.get_or_compute(key(1), compute).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        cache.get_or_compute(key(1), compute).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let cache = ResultCache::default();
        cache
            .get_or_compute(key(1), || async { Ok(record(false)) })
            .await
            .unwrap();
        cache.invalidate(&key(1)).await;
        assert!(cache.get(&key(1)).await.is_none());
    }
}
