//! Community Cache - caching layer for the community platform front end
//!
//! Capacity- and TTL-bounded caches with a transient and a persistent
//! backend, a factory that falls back to memory when durable storage is
//! missing, memoization wrappers and a reactive query helper.
//!
//! Caches are plain values: build them once at start-up with a
//! `CacheFactory` and hand the resulting `SharedCache` to consumers.

pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod memoize;
pub mod query;
pub mod storage;
pub mod telemetry;

pub use cache::{Cache, CacheEntry, CacheStats, EntryStats, MemoryCache, PersistentCache, SharedCache};
pub use config::{CacheConfig, StorageConfig};
pub use error::StorageError;
pub use factory::{CacheFactory, CacheKind};
pub use memoize::{try_with_cache, with_cache, with_cache_async, with_cache_async_by, with_cache_by};
pub use query::{CachedQuery, QueryOptions, QueryState};
pub use storage::{FileStorage, MemoryStorage, StorageArea, StorageHost};
pub use telemetry::init_tracing;
