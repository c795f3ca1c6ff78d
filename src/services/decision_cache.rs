//! Governance decision cache.
//!
//! Bounded, time-expiring cache of authorization verdicts keyed by
//! `(agent_id, action)`. Eviction is least-recently-used; lookups touch
//! recency. Sized for read-heavy, write-light traffic: one mutex with
//! short critical sections guards the map plus a lazy recency queue, and
//! hit/miss/eviction counters are atomics readable without the lock.
//!
//! Entries never persist across restarts.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::domain::models::PermissionDecision;

/// Cache key: one verdict per `(agent_id, action)` pair.
type CacheKey = (String, String);

#[derive(Debug)]
struct CacheEntry {
    decision: PermissionDecision,
    expires_at: Instant,
    /// Recency tick; an order-queue record is live only while its tick
    /// matches the entry's.
    tick: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Recency queue, oldest first. Stale records (tick mismatch) are
    /// skipped on eviction and compacted when the queue outgrows the map.
    order: VecDeque<(u64, CacheKey)>,
    clock: u64,
}

impl CacheInner {
    fn touch(&mut self, key: &CacheKey) {
        self.clock += 1;
        let tick = self.clock;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.tick = tick;
        }
        self.order.push_back((tick, key.clone()));
    }

    fn compact_if_needed(&mut self, capacity: usize) {
        if self.order.len() <= capacity.saturating_mul(2) + 16 {
            return;
        }
        let entries = &self.entries;
        self.order
            .retain(|(tick, key)| entries.get(key).is_some_and(|e| e.tick == *tick));
    }

    /// Pop the true LRU entry. Returns `None` when the map is empty.
    fn evict_lru(&mut self) -> Option<CacheKey> {
        while let Some((tick, key)) = self.order.pop_front() {
            let live = self.entries.get(&key).is_some_and(|e| e.tick == tick);
            if live {
                self.entries.remove(&key);
                return Some(key);
            }
        }
        None
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Bounded LRU + TTL cache of permission decisions.
pub struct DecisionCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl DecisionCache {
    /// Create a cache with the given capacity and verdict TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a live verdict, touching recency on hit. Expired entries
    /// are removed and count as misses.
    pub fn get(&self, agent_id: &str, action: &str) -> Option<PermissionDecision> {
        let key: CacheKey = (agent_id.to_string(), action.to_string());
        let mut inner = self.inner.lock().expect("decision cache poisoned");

        let expired = match inner.entries.get(&key) {
            Some(entry) => entry.expires_at <= Instant::now(),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            inner.entries.remove(&key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        inner.touch(&key);
        inner.compact_if_needed(self.capacity);
        self.hits.fetch_add(1, Ordering::Relaxed);
        inner.entries.get(&key).map(|e| e.decision.clone())
    }

    /// Insert a verdict, evicting the least-recently-used entry when at
    /// capacity.
    pub fn insert(&self, decision: PermissionDecision) {
        let key: CacheKey = (decision.agent_id.clone(), decision.action.clone());
        let mut inner = self.inner.lock().expect("decision cache poisoned");

        if !inner.entries.contains_key(&key) {
            while inner.entries.len() >= self.capacity {
                if inner.evict_lru().is_none() {
                    break;
                }
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        inner.entries.insert(
            key.clone(),
            CacheEntry {
                decision,
                expires_at: Instant::now() + self.ttl,
                tick: 0,
            },
        );
        inner.touch(&key);
        inner.compact_if_needed(self.capacity);
    }

    /// Remove all and only the entries belonging to `agent_id`. Returns
    /// the number removed.
    pub fn invalidate_agent(&self, agent_id: &str) -> usize {
        let mut guard = self.inner.lock().expect("decision cache poisoned");
        let inner = &mut *guard;
        let before = inner.entries.len();
        inner.entries.retain(|(agent, _), _| agent != agent_id);
        let removed = before - inner.entries.len();
        let entries = &inner.entries;
        inner
            .order
            .retain(|(tick, key)| entries.get(key).is_some_and(|e| e.tick == *tick));
        removed
    }

    /// Remove a single `(agent_id, action)` verdict, for forced re-checks.
    pub fn invalidate(&self, agent_id: &str, action: &str) -> bool {
        let key: CacheKey = (agent_id.to_string(), action.to_string());
        let mut inner = self.inner.lock().expect("decision cache poisoned");
        inner.entries.remove(&key).is_some()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock().expect("decision cache poisoned");
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("decision cache poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
