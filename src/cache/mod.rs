//! Cache Module
//!
//! The `Cache` contract and its two backends: a transient in-process map and
//! a persistent cache over a host storage area.

mod entry;
mod memory;
mod order;
mod persistent;
mod stats;


use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use memory::MemoryCache;
pub use order::InsertionOrder;
pub use persistent::PersistentCache;
pub use stats::{CacheStats, EntryStats};

/// A cache instance shared between its consumers.
pub type SharedCache<T> = Arc<dyn Cache<T>>;

// == Cache Trait ==
/// Capacity- and time-bounded key/value store.
///
/// Every operation is infallible from the caller's point of view: backend
/// failures are logged and degrade to a miss or a dropped write.
pub trait Cache<T>: Send + Sync {
    /// Inserts or overwrites `key`, resetting its timestamp and hit count.
    ///
    /// `ttl` overrides the configured default for this entry only. When the
    /// instance is full and `key` is new, room is made first. Backends pick
    /// victims differently: `MemoryCache` evicts the earliest-inserted key,
    /// while `PersistentCache` drops expired entries and then the least-hit
    /// ones.
    fn set(&self, key: &str, value: T, ttl: Option<Duration>);

    /// Returns the value if present and fresh, counting a hit.
    ///
    /// Expired entries are removed as a side effect.
    fn get(&self, key: &str) -> Option<T>;

    /// Same as `get(key).is_some()`, including the expiry check and hit.
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key`; returns true iff an entry was removed.
    fn delete(&self, key: &str) -> bool;

    /// Removes every entry of this instance.
    fn clear(&self);

    /// Number of stored entries, including expired ones not read yet.
    fn size(&self) -> usize;

    fn stats(&self) -> CacheStats;

    /// Purges expired entries, then trims to capacity if needed.
    ///
    /// Returns the number of entries removed. Never runs on its own.
    fn cleanup(&self) -> usize;

    fn config(&self) -> &CacheConfig;
}
