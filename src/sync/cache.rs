//! Per-symbol snapshot cache with a stale-write guard.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// A cached value and the pass that produced it.
#[derive(Debug)]
pub struct Cached<T> {
    /// Sequence number of the producing pass.
    pub seq: u64,
    /// When the value was applied.
    pub applied_at: DateTime<Utc>,
    /// The snapshot.
    pub value: Arc<T>,
}

impl<T> Clone for Cached<T> {
    fn clone(&self) -> Self {
        Self {
            seq: self.seq,
            applied_at: self.applied_at,
            value: Arc::clone(&self.value),
        }
    }
}

/// Outcome counters, published with the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Passes started.
    pub passes: u64,
    /// Results written to the cache.
    pub applied: u64,
    /// Fetches that failed.
    pub failed: u64,
    /// Results dropped by the stale-write guard or because the symbol is no
    /// longer tracked.
    pub discarded: u64,
}

/// Latest snapshot per symbol.
///
/// Only the owning synchronizer writes; everyone else reads a published copy
/// through [`CacheReader`].
#[derive(Debug)]
pub struct SnapshotCache<T> {
    entries: HashMap<String, Cached<T>>,
    stats: SyncStats,
}

impl<T> Clone for SnapshotCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            stats: self.stats,
        }
    }
}

impl<T> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            stats: SyncStats::default(),
        }
    }
}

impl<T> SnapshotCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for `symbol` unless a result from the same or a later
    /// pass is already cached. Returns whether the value was applied.
    pub fn apply(&mut self, symbol: &str, seq: u64, value: T) -> bool {
        if let Some(current) = self.entries.get(symbol)
            && current.seq >= seq
        {
            self.stats.discarded += 1;
            return false;
        }
        self.entries.insert(
            symbol.to_string(),
            Cached {
                seq,
                applied_at: Utc::now(),
                value: Arc::new(value),
            },
        );
        self.stats.applied += 1;
        true
    }

    /// Drop entries for symbols not in `tracked`. Returns how many were removed.
    pub fn retain_symbols(&mut self, tracked: &[String]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|symbol, _| tracked.contains(symbol));
        before - self.entries.len()
    }

    /// Get the cached value for a symbol.
    pub fn get(&self, symbol: &str) -> Option<Arc<T>> {
        self.entries.get(symbol).map(|c| Arc::clone(&c.value))
    }

    /// Get the cached entry, including its sequence number.
    pub fn entry(&self, symbol: &str) -> Option<&Cached<T>> {
        self.entries.get(symbol)
    }

    /// Number of cached symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome counters.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub(crate) fn record_pass(&mut self) {
        self.stats.passes += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.stats.failed += 1;
    }

    pub(crate) fn record_discard(&mut self) {
        self.stats.discarded += 1;
    }
}

/// Read-only view of a synchronizer's cache.
#[derive(Debug)]
pub struct CacheReader<T> {
    rx: watch::Receiver<Arc<SnapshotCache<T>>>,
}

impl<T> Clone for CacheReader<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> CacheReader<T> {
    pub(crate) fn new(rx: watch::Receiver<Arc<SnapshotCache<T>>>) -> Self {
        Self { rx }
    }

    /// Current published cache.
    pub fn snapshot(&self) -> Arc<SnapshotCache<T>> {
        Arc::clone(&self.rx.borrow())
    }

    /// Cached value for one symbol.
    pub fn get(&self, symbol: &str) -> Option<Arc<T>> {
        self.rx.borrow().get(symbol)
    }

    /// Current counters.
    pub fn stats(&self) -> SyncStats {
        self.rx.borrow().stats()
    }

    /// Wait until a new cache is published. Returns `false` once the
    /// synchronizer has stopped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the published cache satisfies `predicate`.
    ///
    /// Returns `None` if the synchronizer stops first.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<Arc<SnapshotCache<T>>>
    where
        F: FnMut(&SnapshotCache<T>) -> bool,
    {
        self.rx
            .wait_for(|cache| predicate(cache))
            .await
            .ok()
            .map(|cache| Arc::clone(&cache))
    }
}
