//! Analysis result cache using moka
//!
//! Results are stored per [`CacheKey`]. Concurrent fetches for the same key
//! collapse into one remote call: moka runs a single init future per key and
//! hands its output to every waiter. Failures are returned to all waiters
//! but never stored, so the next request retries.

use crate::error::AnalysisError;
use crate::key::CacheKey;
use crate::result::AnalysisResult;
use chrono::{DateTime, Utc};
use csl_lineage::FileId;
use dashmap::DashMap;
use moka::future::Cache;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default maximum number of cached results
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// A stored result
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Decoded result
    pub result: AnalysisResult,
    /// When the remote call that produced it was issued
    pub requested_at: DateTime<Utc>,
    /// Position in the cache's completion order
    completion: u64,
}

/// Observable state of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// A remote call for this key is in flight
    Pending,
    /// A result is stored
    Ready,
    /// Nothing stored or in flight (including after a failure)
    Absent,
}

/// How a [`Cached`] value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// This caller issued the remote call
    Remote,
    /// Served from a stored result
    Replayed,
    /// Attached to another caller's in-flight call
    Joined,
}

/// A result together with how it was obtained
#[derive(Debug, Clone)]
pub struct Cached {
    /// Stored entry
    pub entry: Arc<CacheEntry>,
    /// Where it came from
    pub source: FetchSource,
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Stored results
    pub entry_count: u64,
    /// Remote calls in flight
    pub pending: usize,
}

/// Removes a key from the pending set when the fetch finishes or is dropped
struct PendingGuard<'a> {
    pending: &'a DashMap<CacheKey, ()>,
    key: CacheKey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.key);
    }
}

/// Shared cache of analysis results
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    inner: Cache<CacheKey, Arc<CacheEntry>>,
    pending: Arc<DashMap<CacheKey, ()>>,
    /// Count of fetches that produced an entry
    completions: Arc<AtomicU64>,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CAPACITY)
    }
}

impl AnalysisCache {
    /// Create a cache holding at most `max_capacity` results
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
            pending: Arc::new(DashMap::new()),
            completions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a cache whose entries expire `ttl` after insertion
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            pending: Arc::new(DashMap::new()),
            completions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the stored result for `key`, or run `fetch` once for all
    /// concurrent callers
    ///
    /// # Errors
    /// The error produced by the (single) fetch; it is not stored.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Cached, AnalysisError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisResult, AnalysisError>>,
    {
        if let Some(entry) = self.inner.get(&key).await {
            debug!(%key, "analysis replayed from cache");
            return Ok(Cached {
                entry,
                source: FetchSource::Replayed,
            });
        }

        self.load(key, fetch).await
    }

    /// Coalesced fetch behind the fast path of [`Self::get_or_fetch`]
    ///
    /// When this caller's fetch did not run, the entry either completed
    /// before the call (stored meanwhile, so replayed) or during it (joined).
    async fn load<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Cached, AnalysisError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisResult, AnalysisError>>,
    {
        let ran = AtomicBool::new(false);
        let completed_before = self.completions.load(Ordering::SeqCst);
        let init = async {
            ran.store(true, Ordering::SeqCst);
            self.pending.insert(key.clone(), ());
            let _guard = PendingGuard {
                pending: &self.pending,
                key: key.clone(),
            };
            let requested_at = Utc::now();
            let result = fetch().await?;
            let completion = self.completions.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, AnalysisError>(Arc::new(CacheEntry {
                result,
                requested_at,
                completion,
            }))
        };

        let entry = self
            .inner
            .try_get_with(key.clone(), init)
            .await
            .map_err(|e| (*e).clone())?;
        let source = if ran.load(Ordering::SeqCst) {
            FetchSource::Remote
        } else if entry.completion <= completed_before {
            debug!(%key, "analysis replayed from cache");
            FetchSource::Replayed
        } else {
            debug!(%key, "joined in-flight analysis");
            FetchSource::Joined
        };
        Ok(Cached { entry, source })
    }

    /// Current state of `key`
    #[must_use]
    pub fn status(&self, key: &CacheKey) -> CacheStatus {
        if self.pending.contains_key(key) {
            CacheStatus::Pending
        } else if self.inner.contains_key(key) {
            CacheStatus::Ready
        } else {
            CacheStatus::Absent
        }
    }

    /// Stored result for `key`
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.inner.get(key).await
    }

    /// Drop one stored result
    pub async fn invalidate(&self, key: &CacheKey) {
        self.inner.invalidate(key).await;
    }

    /// Drop every stored result
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Drop results for any version other than `current`
    ///
    /// Optional housekeeping: superseded entries are unreachable through
    /// normal requests anyway. Returns the number of entries dropped.
    pub async fn evict_superseded(&self, current: &FileId) -> usize {
        let stale: Vec<CacheKey> = self
            .inner
            .iter()
            .filter(|(key, _)| &key.file_id != current)
            .map(|(key, _)| (*key).clone())
            .collect();
        for key in &stale {
            self.inner.invalidate(key).await;
        }
        if !stale.is_empty() {
            debug!(%current, evicted = stale.len(), "evicted superseded analyses");
        }
        stale.len()
    }

    /// Number of stored results, after pending maintenance has run
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    /// Snapshot statistics
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entry_count().await,
            pending: self.pending.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Signature;
    use crate::kind::AnalysisKind;
    use csl_client::ClientError;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn key(file_id: &str) -> CacheKey {
        CacheKey::new(AnalysisKind::Eda, FileId::new(file_id), Signature::of(b"{}"))
    }

    fn body(n: i64) -> AnalysisResult {
        AnalysisResult::Other {
            kind: AnalysisKind::Forecast,
            body: json!({ "n": n }),
        }
    }

    #[tokio::test]
    async fn second_request_is_replayed() {
        let cache = AnalysisCache::new(16);
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(body(1))
        };

        let first = cache.get_or_fetch(key("F0"), fetch).await.unwrap();
        let second = cache.get_or_fetch(key("F0"), fetch).await.unwrap();

        assert_eq!(first.source, FetchSource::Remote);
        assert_eq!(second.source, FetchSource::Replayed);
        assert_eq!(second.entry.result, body(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let cache = AnalysisCache::new(16);
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let (tx, rx) = oneshot::channel::<()>();

        let first = cache.get_or_fetch(key("F0"), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = rx.await;
            Ok(body(7))
        });
        let second = async {
            while cache.status(&key("F0")) != CacheStatus::Pending {
                tokio::task::yield_now().await;
            }
            let joined = cache.get_or_fetch(key("F0"), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(body(8))
            });
            let _ = tx.send(());
            joined.await
        };

        let (a, b) = futures::join!(first, second);
        assert_eq!(a.unwrap().source, FetchSource::Remote);
        let b = b.unwrap();
        assert_eq!(b.source, FetchSource::Joined);
        assert_eq!(b.entry.result, body(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.status(&key("F0")), CacheStatus::Ready);
    }

    #[tokio::test]
    async fn failures_are_not_stored() {
        let cache = AnalysisCache::new(16);
        let err = cache
            .get_or_fetch(key("F0"), || async {
                Err(AnalysisError::Client(ClientError::http(500, "boom")))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Client(_)));
        assert_eq!(cache.status(&key("F0")), CacheStatus::Absent);

        let retry = cache
            .get_or_fetch(key("F0"), || async { Ok(body(2)) })
            .await
            .unwrap();
        assert_eq!(retry.source, FetchSource::Remote);
    }

    #[tokio::test]
    async fn concurrent_failure_fans_out() {
        let cache = AnalysisCache::new(16);
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let (tx, rx) = oneshot::channel::<()>();

        let first = cache.get_or_fetch(key("F0"), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = rx.await;
            Err(AnalysisError::Client(ClientError::http(502, "upstream down")))
        });
        let second = async {
            while cache.status(&key("F0")) != CacheStatus::Pending {
                tokio::task::yield_now().await;
            }
            let joined = cache.get_or_fetch(key("F0"), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(body(9))
            });
            let _ = tx.send(());
            joined.await
        };

        let (a, b) = futures::join!(first, second);
        let expected = AnalysisError::Client(ClientError::http(502, "upstream down"));
        assert_eq!(a.unwrap_err(), expected);
        assert_eq!(b.unwrap_err(), expected);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.status(&key("F0")), CacheStatus::Absent);
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn entry_stored_before_load_counts_as_replayed() {
        let cache = AnalysisCache::new(16);
        cache.get_or_fetch(key("F0"), || async { Ok(body(3)) }).await.unwrap();

        // skips the fast path, as a caller racing the first store would
        let raced = cache
            .load(key("F0"), || async { Ok(body(4)) })
            .await
            .unwrap();
        assert_eq!(raced.source, FetchSource::Replayed);
        assert_eq!(raced.entry.result, body(3));
    }

    #[tokio::test]
    async fn evict_superseded_keeps_current() {
        let cache = AnalysisCache::new(16);
        for id in ["F0", "F1", "F2"] {
            cache.get_or_fetch(key(id), || async { Ok(body(0)) }).await.unwrap();
        }
        assert_eq!(cache.entry_count().await, 3);

        let evicted = cache.evict_superseded(&FileId::new("F2")).await;
        assert_eq!(evicted, 2);
        assert!(cache.get(&key("F2")).await.is_some());
        assert!(cache.get(&key("F0")).await.is_none());
    }
}
