//! TTL + LRU cache of decoded payloads.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::codec::Decoded;
use crate::core::FormatTag;

/// Cache key: identical bytes on the same topic decode identically.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    topic: String,
    format: FormatTag,
    hash: u64,
}

impl CacheKey {
    /// Build a key by hashing the payload
    pub fn new(topic: &str, format: FormatTag, payload: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        payload.hash(&mut hasher);
        Self {
            topic: topic.to_string(),
            format,
            hash: hasher.finish(),
        }
    }
}

struct Entry {
    value: Arc<Decoded>,
    inserted: Instant,
    last_access: Instant,
}

/// Decoded-payload cache.
///
/// Entries expire `ttl` after insertion. Expired entries are dropped on
/// lookup and by [`sweep`](Self::sweep), which does work at most once per
/// `sweep_interval`. Inserting beyond `capacity` evicts the least recently
/// used entry.
pub struct DecodeCache {
    entries: HashMap<CacheKey, Entry>,
    ttl: Duration,
    capacity: usize,
    sweep_interval: Duration,
    last_sweep: Instant,
}

impl DecodeCache {
    pub fn new(ttl: Duration, capacity: usize, sweep_interval: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
            sweep_interval,
            last_sweep: Instant::now(),
        }
    }

    /// Entries held, expired ones included until the next sweep
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a live entry and mark it used.
    pub fn get(&mut self, key: &CacheKey, now: Instant) -> Option<Arc<Decoded>> {
        let ttl = self.ttl;
        let expired = match self.entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.inserted) < ttl => {
                entry.last_access = now;
                return Some(Arc::clone(&entry.value));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Insert, evicting least recently used entries over capacity.
    pub fn insert(&mut self, key: CacheKey, value: Arc<Decoded>, now: Instant) {
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.capacity {
                let Some(oldest) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                self.entries.remove(&oldest);
                log::debug!("Decode cache evicted LRU entry for {}", oldest.topic);
            }
        }
        self.entries.insert(
            key,
            Entry {
                value,
                inserted: now,
                last_access: now,
            },
        );
    }

    /// Drop expired entries if the sweep interval has passed.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        if now.duration_since(self.last_sweep) < self.sweep_interval {
            return 0;
        }
        self.last_sweep = now;
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.duration_since(e.inserted) < ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("Decode cache swept {removed} expired entries");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
