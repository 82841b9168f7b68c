//! Persistent Cache Module
//!
//! Cache engine over a host storage area. Entries are stored as JSON under
//! namespaced keys (`"<namespace>:<key>"`), so several caches and unrelated
//! data can share one area.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{current_timestamp_ms, Cache, CacheEntry, CacheStats, EntryStats};
use crate::config::{CacheConfig, DEFAULT_NAMESPACE};
use crate::storage::StorageArea;

// == Persistent Cache ==
/// Cache whose entries live in a `StorageArea`.
///
/// Every successful `get` writes the entry back to persist its hit count.
/// Over a `FileStorage` area that rewrites the whole file on each hit, so
/// read-heavy caches are better placed in the session area.
pub struct PersistentCache<T> {
    storage: Arc<dyn StorageArea>,
    /// Key prefix including the trailing separator
    prefix: String,
    config: CacheConfig,
    /// Serializes multi-step storage sequences of this instance
    op_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PersistentCache<T> {
    // == Constructor ==
    /// Creates a cache under the default namespace.
    pub fn new(storage: Arc<dyn StorageArea>, config: CacheConfig) -> Self {
        Self::with_namespace(storage, config, DEFAULT_NAMESPACE)
    }

    /// Creates a cache whose keys are stored as `"<namespace>:<key>"`.
    ///
    /// `namespace` must not contain `':'`. Namespace `feed` would otherwise
    /// claim every key of namespace `feed:v2` in the same area, and count,
    /// trim and clear them as its own.
    pub fn with_namespace(
        storage: Arc<dyn StorageArea>,
        config: CacheConfig,
        namespace: &str,
    ) -> Self {
        if namespace.contains(':') {
            warn!(namespace, "namespace contains ':' and may overlap another namespace");
        }
        Self {
            storage,
            prefix: format!("{namespace}:"),
            config,
            op_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn namespace(&self) -> &str {
        self.prefix.trim_end_matches(':')
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Storage keys belonging to this namespace.
    fn namespaced_keys(&self) -> Vec<String> {
        self.storage
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&self.prefix))
            .collect()
    }
}

impl<T> fmt::Debug for PersistentCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentCache")
            .field("namespace", &self.namespace())
            .field("config", &self.config)
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> PersistentCache<T> {
    fn parse(raw: &str) -> Option<CacheEntry<T>> {
        serde_json::from_str(raw).ok()
    }

    // == Trim ==
    /// Removes expired and unreadable entries, then the least-hit entries
    /// (oldest first among equal hits) until at most `budget` remain.
    fn trim_to(&self, budget: usize) -> usize {
        let now = current_timestamp_ms();
        let mut removed = 0;
        let mut live: Vec<(String, u64, u64)> = Vec::new();

        for storage_key in self.namespaced_keys() {
            let Some(raw) = self.storage.get_item(&storage_key) else {
                continue;
            };
            match Self::parse(&raw) {
                Some(entry) if !entry.is_expired_at(now) => {
                    live.push((storage_key, entry.hits, entry.timestamp));
                }
                _ => {
                    self.storage.remove_item(&storage_key);
                    removed += 1;
                }
            }
        }

        if live.len() > budget {
            live.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)));
            let excess = live.len() - budget;
            for (storage_key, hits, _) in live.into_iter().take(excess) {
                self.storage.remove_item(&storage_key);
                debug!(key = %storage_key, hits, "evicted least-hit entry");
                removed += 1;
            }
        }

        removed
    }

    // == Write ==
    /// Writes an entry, cleaning up and retrying once on failure.
    fn write(&self, key: &str, storage_key: &str, raw: &str) {
        let Err(err) = self.storage.set_item(storage_key, raw) else {
            return;
        };
        warn!(key, error = %err, "storage write failed, cleaning up and retrying");

        let removed = self.trim_to(self.config.max_size);
        debug!(removed, "cleanup before retry");

        if let Err(err) = self.storage.set_item(storage_key, raw) {
            warn!(key, error = %err, "storage write failed after cleanup, value dropped");
        }
    }
}

impl<T> Cache<T> for PersistentCache<T>
where
    T: Serialize + DeserializeOwned,
{
    // == Set ==
    fn set(&self, key: &str, value: T, ttl: Option<Duration>) {
        if self.config.max_size == 0 {
            debug!(key, "cache has zero capacity, dropping write");
            return;
        }

        let _guard = self.op_lock.lock();
        let storage_key = self.storage_key(key);

        // Make room for a new key before writing it
        if self.storage.get_item(&storage_key).is_none()
            && self.namespaced_keys().len() >= self.config.max_size
        {
            self.trim_to(self.config.max_size - 1);
        }

        let entry = CacheEntry::new(value, ttl.unwrap_or(self.config.ttl));
        match serde_json::to_string(&entry) {
            Ok(raw) => self.write(key, &storage_key, &raw),
            Err(err) => warn!(key, error = %err, "failed to serialize cache entry, value dropped"),
        }
    }

    // == Get ==
    fn get(&self, key: &str) -> Option<T> {
        let _guard = self.op_lock.lock();
        let storage_key = self.storage_key(key);
        let raw = self.storage.get_item(&storage_key)?;

        let Some(mut entry) = Self::parse(&raw) else {
            warn!(key, "discarding unreadable cache entry");
            self.storage.remove_item(&storage_key);
            return None;
        };

        if entry.is_expired() {
            self.storage.remove_item(&storage_key);
            debug!(key, "cache entry expired");
            return None;
        }

        entry.record_hit();
        let updated = serde_json::to_string(&entry)
            .map_err(|err| err.to_string())
            .and_then(|raw| {
                self.storage
                    .set_item(&storage_key, &raw)
                    .map_err(|err| err.to_string())
            });
        if let Err(err) = updated {
            debug!(key, error = %err, "could not persist hit count");
        }

        Some(entry.data)
    }

    // == Delete ==
    fn delete(&self, key: &str) -> bool {
        let _guard = self.op_lock.lock();
        let storage_key = self.storage_key(key);

        if self.storage.get_item(&storage_key).is_some() {
            self.storage.remove_item(&storage_key);
            true
        } else {
            false
        }
    }

    fn clear(&self) {
        let _guard = self.op_lock.lock();
        for storage_key in self.namespaced_keys() {
            self.storage.remove_item(&storage_key);
        }
    }

    fn size(&self) -> usize {
        self.namespaced_keys().len()
    }

    // == Stats ==
    fn stats(&self) -> CacheStats {
        let keys = self.namespaced_keys();
        let mut rows: Vec<(u64, EntryStats)> = keys
            .iter()
            .filter_map(|storage_key| {
                let raw = self.storage.get_item(storage_key)?;
                let entry = Self::parse(&raw)?;
                let key = storage_key.strip_prefix(&self.prefix)?;
                Some((entry.timestamp, EntryStats::from_entry(key, &entry)))
            })
            .collect();

        rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.key.cmp(&b.1.key)));
        CacheStats::new(keys.len(), rows.into_iter().map(|(_, row)| row).collect())
    }

    // == Cleanup ==
    fn cleanup(&self) -> usize {
        let _guard = self.op_lock.lock();
        let removed = self.trim_to(self.config.max_size);
        if removed > 0 {
            debug!(removed, namespace = self.namespace(), "storage cleanup");
        }
        removed
    }

    fn config(&self) -> &CacheConfig {
        &self.config
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, StorageError};
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;

    fn config(max_size: usize) -> CacheConfig {
        CacheConfig::new(Duration::from_secs(300), max_size)
    }

    fn cache(storage: &Arc<MemoryStorage>, max_size: usize) -> PersistentCache<String> {
        PersistentCache::new(storage.clone(), config(max_size))
    }

    /// Area that rejects every write.
    #[derive(Default)]
    struct FullStorage {
        attempts: AtomicUsize,
    }

    impl StorageArea for FullStorage {
        fn get_item(&self, _key: &str) -> Option<String> {
            None
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                required: key.len() + value.len(),
                available: 0,
            })
        }

        fn remove_item(&self, _key: &str) {}

        fn keys(&self) -> Vec<String> {
            Vec::new()
        }

        fn usage_bytes(&self) -> usize {
            0
        }

        fn quota_bytes(&self) -> usize {
            0
        }
    }

    #[test]
    fn test_set_and_get() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 10);

        cache.set("feed", "posts".to_string(), None);

        assert_eq!(cache.get("feed"), Some("posts".to_string()));
        assert!(storage.get_item("community:feed").is_some());
    }

    #[test]
    fn test_hits_are_persisted() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 10);

        cache.set("k", "v".to_string(), None);
        cache.get("k");
        cache.get("k");

        let raw = storage.get_item("community:k").unwrap();
        let entry: CacheEntry<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.hits, 2);
        assert_eq!(cache.stats().entry("k").map(|e| e.hits), Some(2));
    }

    #[test]
    fn test_ttl_expiration() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 10);

        cache.set("k", "v".to_string(), Some(Duration::from_millis(50)));
        assert!(cache.has("k"));

        sleep(Duration::from_millis(80));

        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_purged() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 10);

        storage.set_item("community:bad", "{broken").unwrap();

        assert_eq!(cache.get("bad"), None);
        assert!(storage.get_item("community:bad").is_none());
    }

    #[test]
    fn test_stats_skip_unparseable_entries() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 10);

        cache.set("good", "v".to_string(), None);
        storage.set_item("community:bad", "not json").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.entries.len(), 1);
        assert_eq!(stats.entries[0].key, "good");
    }

    #[test]
    fn test_foreign_keys_untouched() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 10);

        storage.set_item("theme", "dark").unwrap();
        storage.set_item("other:k", "x").unwrap();
        cache.set("k", "v".to_string(), None);

        assert_eq!(cache.size(), 1);
        cache.clear();

        assert_eq!(cache.size(), 0);
        assert_eq!(storage.get_item("theme"), Some("dark".to_string()));
        assert_eq!(storage.get_item("other:k"), Some("x".to_string()));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let storage = Arc::new(MemoryStorage::default());
        let users: PersistentCache<String> =
            PersistentCache::with_namespace(storage.clone(), config(10), "users");
        let posts: PersistentCache<String> =
            PersistentCache::with_namespace(storage.clone(), config(10), "posts");

        users.set("1", "alice".to_string(), None);
        posts.set("1", "hello".to_string(), None);

        assert_eq!(users.get("1"), Some("alice".to_string()));
        assert_eq!(posts.get("1"), Some("hello".to_string()));
        assert!(users.delete("1"));
        assert!(posts.has("1"));
        assert_eq!(users.namespace(), "users");
    }

    #[test]
    fn test_namespace_prefix_includes_separator() {
        let storage = Arc::new(MemoryStorage::default());
        let feed: PersistentCache<String> =
            PersistentCache::with_namespace(storage.clone(), config(10), "feed");
        let feeds: PersistentCache<String> =
            PersistentCache::with_namespace(storage.clone(), config(10), "feeds");

        feed.set("1", "a".to_string(), None);
        feeds.set("1", "b".to_string(), None);
        feed.clear();

        assert_eq!(feed.size(), 0);
        assert_eq!(feeds.size(), 1);
        assert_eq!(feeds.get("1"), Some("b".to_string()));
    }

    #[test]
    fn test_delete() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 10);

        cache.set("k1", "v1".to_string(), None);
        cache.set("k2", "v2".to_string(), None);

        assert!(cache.delete("k1"));
        assert!(!cache.delete("k1"));
        assert_eq!(cache.get("k2"), Some("v2".to_string()));
    }

    #[test]
    fn test_capacity_evicts_least_hit() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 2);

        cache.set("popular", "a".to_string(), None);
        sleep(Duration::from_millis(2));
        cache.set("quiet", "b".to_string(), None);
        cache.get("popular");

        cache.set("new", "c".to_string(), None);

        assert_eq!(cache.size(), 2);
        assert!(cache.has("popular"));
        assert!(cache.has("new"));
        assert!(!cache.has("quiet"));
    }

    #[test]
    fn test_cleanup_orders_by_hits() {
        let storage = Arc::new(MemoryStorage::default());
        let writer = cache(&storage, 10);

        writer.set("a", "1".to_string(), None);
        writer.set("b", "2".to_string(), None);
        writer.set("c", "3".to_string(), None);
        writer.get("a");
        writer.get("a");
        writer.get("c");

        // A smaller budget over the same namespace forces trimming
        let trimmer = cache(&storage, 1);
        assert_eq!(trimmer.cleanup(), 2);
        assert!(writer.has("a"));
        assert_eq!(writer.size(), 1);
    }

    #[test]
    fn test_cleanup_removes_expired_first() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 10);

        cache.set("short", "1".to_string(), Some(Duration::from_millis(20)));
        cache.set("long", "2".to_string(), None);
        sleep(Duration::from_millis(50));

        assert_eq!(cache.cleanup(), 1);
        assert!(cache.has("long"));
    }

    #[test]
    fn test_quota_exceeded_cleans_up_and_retries() {
        // Each entry takes a little over 100 bytes: room for two, not three
        let storage = Arc::new(MemoryStorage::new(300));
        let cache = cache(&storage, 10);

        cache.set("old", "x".repeat(40), Some(Duration::from_millis(10)));
        cache.set("keep", "y".repeat(40), None);
        sleep(Duration::from_millis(30));

        cache.set("fresh", "z".repeat(40), None);

        assert_eq!(cache.get("fresh"), Some("z".repeat(40)));
        assert!(storage.get_item("community:old").is_none());
    }

    #[test]
    fn test_set_never_fails_when_storage_is_full() {
        let storage = Arc::new(FullStorage::default());
        let cache: PersistentCache<String> = PersistentCache::new(storage.clone(), config(10));

        cache.set("k", "v".to_string(), None);

        // First attempt plus exactly one retry
        assert_eq!(storage.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let storage = Arc::new(MemoryStorage::default());
        let cache = cache(&storage, 0);

        cache.set("k", "v".to_string(), None);
        assert_eq!(cache.size(), 0);
    }
}
