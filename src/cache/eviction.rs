use std::time::Duration;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use tracing::debug;
use crate::compression::compress::{CompressedBlock, CompressionPriority};
use crate::core::clock::{elapsed_exceeds, system_clock, SharedClock};
use crate::core::config::CacheConfig;
use crate::core::error::{Error, Result};

/// Serialized values larger than this are compressed by `put_compressed`
pub const COMPRESSION_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub inserted_at: DateTime<Utc>,
    pub refreshed_at: DateTime<Utc>,
    pub access_count: u64,
}

/// Fixed-capacity LRU cache with absolute expiry.
///
/// Recency is kept by `LruCache` (MRU at the front). Capacity is enforced
/// here rather than by `LruCache` so every eviction is counted. An entry
/// expires once more than `ttl` has passed since it was last written,
/// regardless of reads; expired entries are dropped lazily on access or
/// eagerly by `clean_expired`.
///
/// Not internally synchronized: share it behind one lock per instance.
pub struct EvictionCache<V> {
    entries: LruCache<String, CacheEntry<V>>,
    capacity: usize,
    ttl: Duration,
    clock: SharedClock,
    weight_fn: fn(&V) -> usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    ttl_expiries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub ttl_expiries: u64,
    pub size: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub hit_rate: f64,
    pub memory_usage: usize,
}

impl<V> EvictionCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        Self::with_clock(capacity, ttl, system_clock())
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: SharedClock) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument("cache capacity must be at least 1"));
        }

        Ok(EvictionCache {
            entries: LruCache::unbounded(),
            capacity,
            ttl,
            clock,
            weight_fn: |_| 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            ttl_expiries: 0,
        })
    }

    pub fn from_config(config: &CacheConfig, clock: SharedClock) -> Result<Self> {
        Self::with_clock(config.capacity, config.ttl(), clock)
    }

    /// Count heap bytes owned by values in `memory_usage`
    pub fn with_weight_fn(mut self, weight_fn: fn(&V) -> usize) -> Self {
        self.weight_fn = weight_fn;
        self
    }

    /// Look up `key`, promoting it to most-recently-used on a hit.
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let now = self.clock.now();
        let expired = match self.entries.peek(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => elapsed_exceeds(entry.refreshed_at, now, self.ttl),
        };

        if expired {
            self.entries.pop(key);
            self.ttl_expiries += 1;
            self.misses += 1;
            debug!(key, "cache entry expired");
            return None;
        }

        self.hits += 1;
        let entry = self.entries.get_mut(key)?;
        entry.access_count += 1;
        Some(&entry.value)
    }

    /// Insert or overwrite. Overwriting refreshes the TTL and promotes the
    /// entry; a new key evicts the least-recently-used entry when full.
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now();

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.refreshed_at = now;
            return;
        }

        self.evict_down_to(self.capacity - 1);
        self.entries.put(key.clone(), CacheEntry {
            key,
            value,
            inserted_at: now,
            refreshed_at: now,
            access_count: 0,
        });
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.pop(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// TTL-aware membership test; does not touch recency
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .peek(key)
            .is_some_and(|entry| !elapsed_exceeds(entry.refreshed_at, now, self.ttl))
    }

    /// Live entry for `key` without promotion
    pub fn peek_entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        let now = self.clock.now();
        self.entries
            .peek(key)
            .filter(|entry| !elapsed_exceeds(entry.refreshed_at, now, self.ttl))
    }

    /// Non-expired keys, most recently used first
    pub fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|(_, entry)| !elapsed_exceeds(entry.refreshed_at, now, self.ttl))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Drop every expired entry now; returns how many were removed
    pub fn clean_expired(&mut self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = self.entries
            .iter()
            .filter(|(_, entry)| elapsed_exceeds(entry.refreshed_at, now, self.ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key.as_str());
        }
        self.ttl_expiries += expired.len() as u64;

        if !expired.is_empty() {
            debug!(removed = expired.len(), "swept expired cache entries");
        }
        expired.len()
    }

    /// Change the bound; shrinking evicts from the LRU end immediately.
    /// Returns the number of entries evicted.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<usize> {
        if capacity == 0 {
            return Err(Error::invalid_argument("cache capacity must be at least 1"));
        }
        self.capacity = capacity;
        Ok(self.evict_down_to(capacity))
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            ttl_expiries: self.ttl_expiries,
            size: self.entries.len(),
            capacity: self.capacity,
            ttl_secs: self.ttl.as_secs(),
            hit_rate: self.hits as f64 / total.max(1) as f64,
            memory_usage: self.memory_usage(),
        }
    }

    /// Approximate bytes: entry structs, both copies of each key, and
    /// whatever the weight function reports for values
    fn memory_usage(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, entry)| {
                std::mem::size_of::<CacheEntry<V>>() + key.len() * 2 + (self.weight_fn)(&entry.value)
            })
            .sum()
    }

    fn evict_down_to(&mut self, target: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > target {
            match self.entries.pop_lru() {
                Some((key, _)) => {
                    debug!(key = %key, "evicted least recently used cache entry");
                    evicted += 1;
                }
                None => break,
            }
        }
        self.evictions += evicted as u64;
        evicted
    }
}

impl EvictionCache<CompressedBlock> {
    /// Serialize `value` to JSON and store it, LZ4-compressing payloads over
    /// `COMPRESSION_THRESHOLD` bytes. Returns whether compression was applied.
    pub fn put_compressed<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> Result<bool> {
        self.put_compressed_with(key, value, CompressionPriority::Speed)
    }

    /// `put_compressed` with the codec picked by `priority`
    pub fn put_compressed_with<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
        priority: CompressionPriority,
    ) -> Result<bool> {
        let bytes = serde_json::to_vec(value)?;
        let block = if bytes.len() > COMPRESSION_THRESHOLD {
            CompressedBlock::compress_auto(&bytes, priority)?
        } else {
            CompressedBlock::raw(bytes)
        };

        let compressed = block.is_compressed();
        self.put(key, block);
        Ok(compressed)
    }

    /// Reverse of `put_compressed`. A damaged or undecodable entry is an
    /// error, never a silent miss.
    pub fn get_compressed<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        let Some(block) = self.get(key) else {
            return Ok(None);
        };
        let bytes = block.decompress()?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
