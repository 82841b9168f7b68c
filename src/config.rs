//! Configuration Module
//!
//! Cache and storage settings, loaded from environment variables with
//! sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Namespace prepended to every persistent key when none is given.
pub const DEFAULT_NAMESPACE: &str = "community";

/// Default byte quota of a storage area (matches common browser limits).
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
const DEFAULT_MAX_SIZE: usize = 100;

// == Cache Config ==
/// Per-instance cache parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime applied when `set` is called without an explicit TTL
    pub ttl: Duration,
    /// Maximum number of entries held after any `set` returns
    pub max_size: usize,
    /// Advisory flag; recorded but not enforced by the backends
    pub stale_while_revalidate: bool,
}

impl CacheConfig {
    /// Creates a config with the given default TTL and capacity.
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            stale_while_revalidate: false,
        }
    }

    /// Loads values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_SIZE` - Maximum entries per instance (default: 100)
    /// - `CACHE_STALE_WHILE_REVALIDATE` - Advisory flag (default: false)
    pub fn from_env() -> Self {
        Self {
            ttl: Duration::from_millis(parse_env("CACHE_TTL_MS").unwrap_or(DEFAULT_TTL_MS)),
            max_size: parse_env("CACHE_MAX_SIZE").unwrap_or(DEFAULT_MAX_SIZE),
            stale_while_revalidate: parse_env("CACHE_STALE_WHILE_REVALIDATE").unwrap_or(false),
        }
    }

    /// Sets the capacity.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the default TTL.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the advisory stale-while-revalidate flag.
    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TTL_MS), DEFAULT_MAX_SIZE)
    }
}

// == Storage Config ==
/// Where and how the host storage areas live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Namespace used by persistent caches that are not given one
    pub namespace: String,
    /// Directory for the long-lived area; `None` leaves it unavailable
    pub storage_dir: Option<PathBuf>,
    /// Byte quota applied to each area
    pub quota_bytes: usize,
}

impl StorageConfig {
    /// Loads values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAMESPACE` - Key namespace (default: "community")
    /// - `CACHE_STORAGE_DIR` - Directory for the file-backed area (default: unset)
    /// - `CACHE_STORAGE_QUOTA_BYTES` - Per-area quota (default: 5 MiB)
    pub fn from_env() -> Self {
        Self {
            namespace: env::var("CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            storage_dir: env::var("CACHE_STORAGE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            quota_bytes: parse_env("CACHE_STORAGE_QUOTA_BYTES")
                .unwrap_or(DEFAULT_STORAGE_QUOTA_BYTES),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            storage_dir: None,
            quota_bytes: DEFAULT_STORAGE_QUOTA_BYTES,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
