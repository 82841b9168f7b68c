//! Cache Factory
//!
//! Builds cache instances by kind. Persistent kinds fall back to the
//! transient cache when the requested storage area does not exist, so
//! callers always get a working `Cache`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{MemoryCache, PersistentCache, SharedCache};
use crate::config::CacheConfig;
use crate::storage::StorageHost;

// == Cache Kind ==
/// Which backend a cache should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Process-local map
    Memory,
    /// Persistent cache over the session-scoped area
    Session,
    /// Persistent cache over the long-lived area
    Local,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheKind::Memory => "memory",
            CacheKind::Session => "session",
            CacheKind::Local => "local",
        };
        f.write_str(name)
    }
}

impl FromStr for CacheKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheKind::Memory),
            "session" => Ok(CacheKind::Session),
            "local" => Ok(CacheKind::Local),
            other => Err(format!("unknown cache kind: {other}")),
        }
    }
}

// == Cache Factory ==
/// Creates caches over the storage areas of one host.
#[derive(Debug, Clone, Default)]
pub struct CacheFactory {
    host: StorageHost,
}

impl CacheFactory {
    pub fn new(host: StorageHost) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &StorageHost {
        &self.host
    }

    /// Creates a cache of the requested kind.
    ///
    /// `namespace` only affects persistent caches; `None` uses the host's
    /// namespace. A missing storage area yields a `MemoryCache` instead.
    pub fn create<T>(
        &self,
        kind: CacheKind,
        config: CacheConfig,
        namespace: Option<&str>,
    ) -> SharedCache<T>
    where
        T: Clone + Serialize + DeserializeOwned + Send + 'static,
    {
        let area = match kind {
            CacheKind::Memory => return Arc::new(MemoryCache::new(config)),
            CacheKind::Session => self.host.session(),
            CacheKind::Local => self.host.local(),
        };

        match area {
            Some(storage) => {
                let namespace = namespace.unwrap_or(self.host.namespace());
                Arc::new(PersistentCache::with_namespace(
                    Arc::clone(storage),
                    config,
                    namespace,
                ))
            }
            None => {
                info!(%kind, "storage area unavailable, using memory cache");
                Arc::new(MemoryCache::new(config))
            }
        }
    }
}
