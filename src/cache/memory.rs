//! Transient Cache Module
//!
//! Process-local cache engine combining HashMap storage with insertion-order
//! tracking and lazy TTL expiration.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{Cache, CacheEntry, CacheStats, EntryStats, InsertionOrder};
use crate::config::CacheConfig;

#[derive(Debug)]
struct MemoryStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// First-insertion order, used for eviction
    order: InsertionOrder,
}

// == Memory Cache ==
/// In-process cache with FIFO eviction and lazy expiry.
pub struct MemoryCache<T> {
    store: Mutex<MemoryStore<T>>,
    config: CacheConfig,
}

impl<T> MemoryCache<T> {
    // == Constructor ==
    /// Creates an empty cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: Mutex::new(MemoryStore {
                entries: HashMap::new(),
                order: InsertionOrder::new(),
            }),
            config,
        }
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.lock().entries.is_empty()
    }
}

impl<T> fmt::Debug for MemoryCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("config", &self.config)
            .field("size", &self.store.lock().entries.len())
            .finish()
    }
}

impl<T: Clone + Send> Cache<T> for MemoryCache<T> {
    // == Set ==
    fn set(&self, key: &str, value: T, ttl: Option<Duration>) {
        if self.config.max_size == 0 {
            debug!(key, "cache has zero capacity, dropping write");
            return;
        }

        let mut guard = self.store.lock();
        let store = &mut *guard;

        // Only a new key can push the cache past capacity
        if !store.entries.contains_key(key) && store.entries.len() >= self.config.max_size {
            if let Some(evicted) = store.order.pop_oldest() {
                store.entries.remove(&evicted);
                debug!(key = %evicted, "evicted earliest-inserted entry");
            }
        }

        let entry = CacheEntry::new(value, ttl.unwrap_or(self.config.ttl));
        store.entries.insert(key.to_string(), entry);
        store.order.insert(key);
    }

    // == Get ==
    fn get(&self, key: &str) -> Option<T> {
        let mut guard = self.store.lock();
        let store = &mut *guard;

        match store.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.record_hit();
                Some(entry.data.clone())
            }
            Some(_) => {
                store.entries.remove(key);
                store.order.remove(key);
                debug!(key, "cache entry expired");
                None
            }
            None => None,
        }
    }

    // == Delete ==
    fn delete(&self, key: &str) -> bool {
        let mut guard = self.store.lock();
        let store = &mut *guard;

        if store.entries.remove(key).is_some() {
            store.order.remove(key);
            true
        } else {
            false
        }
    }

    fn clear(&self) {
        let mut store = self.store.lock();
        store.entries.clear();
        store.order.clear();
    }

    fn size(&self) -> usize {
        self.store.lock().entries.len()
    }

    // == Stats ==
    fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        let rows = store
            .order
            .iter()
            .filter_map(|key| {
                store
                    .entries
                    .get(key)
                    .map(|entry| EntryStats::from_entry(key.as_str(), entry))
            })
            .collect();
        CacheStats::new(store.entries.len(), rows)
    }

    // == Cleanup ==
    fn cleanup(&self) -> usize {
        let mut guard = self.store.lock();
        let store = &mut *guard;

        let expired_keys: Vec<String> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            store.entries.remove(key);
            store.order.remove(key);
        }

        if !expired_keys.is_empty() {
            debug!(removed = expired_keys.len(), "purged expired entries");
        }
        expired_keys.len()
    }

    fn config(&self) -> &CacheConfig {
        &self.config
    }
}
