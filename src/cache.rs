// Query cache: aggregated results keyed by query shape, swept by the refresh worker.
//
// One coarse RwLock guards the whole map. Requests and the refresher only hold it for
// in-memory work (never across an await), so contention stays low and iteration
// (sweep, keys) is trivially consistent with concurrent single-key writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::models::{AggregationQuery, Bucket};

/// Identity of a cached result: the full validated query, used directly as the map key.
/// Nothing is ever parsed back out of a string; the refresher rebuilds the query from here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CacheKey(AggregationQuery);

impl CacheKey {
    pub fn query(&self) -> &AggregationQuery {
        &self.0
    }
}

impl From<&AggregationQuery> for CacheKey {
    fn from(query: &AggregationQuery) -> Self {
        Self(query.clone())
    }
}

impl From<AggregationQuery> for CacheKey {
    fn from(query: AggregationQuery) -> Self {
        Self(query)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub buckets: Vec<Bucket>,
    pub computed_at: DateTime<Utc>,
    /// Last refresh attempt failed; `buckets` is the previous successful result.
    pub stale: bool,
}

/// Result of writing a recomputed value back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Changed,
    Unchanged,
    /// Evicted between listing and write-back; not reinserted.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Slot {
    seq: u64,
    entry: CacheEntry,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<CacheKey, Slot>,
    next_seq: u64,
}

pub struct QueryCache {
    inner: RwLock<Inner>,
    expiration: TimeDelta,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(expiration: TimeDelta) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            expiration,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock cannot leave a half-written slot behind
    // (every mutation is a single insert/remove/assign), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let found = self.read().slots.get(key).map(|s| s.entry.clone());
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert or overwrite. An overwritten key keeps its original insertion position.
    pub fn put(&self, key: CacheKey, buckets: Vec<Bucket>, computed_at: DateTime<Utc>) {
        let entry = CacheEntry {
            buckets,
            computed_at,
            stale: false,
        };
        let mut inner = self.write();
        if let Some(slot) = inner.slots.get_mut(&key) {
            slot.entry = entry;
            return;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.slots.insert(key, Slot { seq, entry });
    }

    /// Compare-and-swap for the refresher: replaces buckets only if they differ by value.
    pub fn apply_refresh(
        &self,
        key: &CacheKey,
        buckets: Vec<Bucket>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        let mut inner = self.write();
        let Some(slot) = inner.slots.get_mut(key) else {
            return RefreshOutcome::Missing;
        };
        slot.entry.stale = false;
        if slot.entry.buckets == buckets {
            return RefreshOutcome::Unchanged;
        }
        slot.entry.buckets = buckets;
        slot.entry.computed_at = now;
        RefreshOutcome::Changed
    }

    /// Flags an entry whose recomputation failed. Returns false if the key is gone.
    pub fn mark_stale(&self, key: &CacheKey) -> bool {
        match self.write().slots.get_mut(key) {
            Some(slot) => {
                slot.entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// Removes every entry with `now - computed_at >= expiration`; returns the evicted keys
    /// in insertion order.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<CacheKey> {
        let mut inner = self.write();
        let mut expired: Vec<(u64, CacheKey)> = inner
            .slots
            .iter()
            .filter(|(_, slot)| now - slot.entry.computed_at >= self.expiration)
            .map(|(key, slot)| (slot.seq, key.clone()))
            .collect();
        for (_, key) in &expired {
            inner.slots.remove(key);
        }
        expired.sort_by_key(|(seq, _)| *seq);
        expired.into_iter().map(|(_, key)| key).collect()
    }

    /// Snapshot of all keys, oldest-inserted first.
    pub fn keys(&self) -> Vec<CacheKey> {
        let inner = self.read();
        let mut keys: Vec<(u64, &CacheKey)> =
            inner.slots.iter().map(|(k, s)| (s.seq, k)).collect();
        keys.sort_by_key(|(seq, _)| *seq);
        keys.into_iter().map(|(_, k)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
