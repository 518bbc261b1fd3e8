use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use super::ingest::Acquirer;
use super::types::{CacheStatus, Document, SourceStatus};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// An immutable, complete document set. Replaced wholesale on refresh.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub documents: Vec<Arc<Document>>,
    refreshed_at: Option<Instant>,
    pub refreshed_at_utc: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: documents.into_iter().map(Arc::new).collect(),
            refreshed_at: Some(Instant::now()),
            refreshed_at_utc: Some(Utc::now()),
        }
    }
}

/// TTL-gated holder of the current document set.
///
/// Readers clone an `Arc<Snapshot>` and keep using it for the whole query,
/// so a refresh never exposes a half-built set. The write lock is only held
/// for the pointer swap; the fetch itself runs under `refresh_lock`, which
/// serializes refreshes without blocking readers.
pub struct FreshnessCache {
    acquirer: Acquirer,
    ttl_ms: AtomicU64,
    current: RwLock<Arc<Snapshot>>,
    refresh_lock: Mutex<()>,
    refreshes: AtomicU64,
}

impl FreshnessCache {
    pub fn new(acquirer: Acquirer, ttl: Duration) -> Self {
        Self {
            acquirer,
            ttl_ms: AtomicU64::new(whole_millis(ttl)),
            current: RwLock::new(Arc::new(Snapshot::default())),
            refresh_lock: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed))
    }

    /// Sub-millisecond values are raised to 1ms.
    pub fn set_ttl(&self, ttl: Duration) {
        let millis = whole_millis(ttl);
        self.ttl_ms.store(millis, Ordering::Relaxed);
        info!(ttl_ms = millis, "Cache TTL updated");
    }

    /// Number of completed acquisitions since startup.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// The set currently visible to readers, without any freshness check.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().await.clone()
    }

    fn is_stale(&self, snapshot: &Snapshot) -> bool {
        match snapshot.refreshed_at {
            None => true,
            Some(_) if snapshot.documents.is_empty() => true,
            Some(at) => at.elapsed() > self.ttl(),
        }
    }

    /// Return a fresh snapshot, re-acquiring every source when forced, when
    /// nothing was ever fetched, when the TTL has elapsed or when the set is
    /// empty.
    pub async fn ensure_fresh(&self, force: bool) -> Arc<Snapshot> {
        if !force {
            let snapshot = self.snapshot().await;
            if !self.is_stale(&snapshot) {
                return snapshot;
            }
        }

        let _guard = self.refresh_lock.lock().await;
        if !force {
            // Another caller may have refreshed while we waited.
            let snapshot = self.snapshot().await;
            if !self.is_stale(&snapshot) {
                debug!("Refresh already completed by a concurrent caller");
                return snapshot;
            }
        }

        info!(force, "Refreshing document cache");
        let started = Instant::now();
        let documents = self.acquirer.fetch_all().await;
        let fresh = Arc::new(Snapshot::new(documents));

        *self.current.write().await = fresh.clone();
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        info!(
            documents = fresh.documents.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document cache swapped"
        );
        fresh
    }

    pub async fn status(&self) -> CacheStatus {
        let snapshot = self.snapshot().await;
        CacheStatus {
            last_refreshed: snapshot.refreshed_at_utc,
            sources: snapshot
                .documents
                .iter()
                .map(|d| SourceStatus {
                    label: d.source_type.label(),
                    url: d.source_url.clone(),
                    is_fallback: d.is_fallback,
                    content_length: d.content.chars().count(),
                    fetched_at: d.fetched_at,
                })
                .collect(),
        }
    }
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}
