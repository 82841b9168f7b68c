//! Storage Module
//!
//! Host key/value storage areas: synchronous, string-keyed, string-valued
//! and bounded by a byte quota. `StorageHost` describes which areas exist in
//! the current execution context.

mod file;
mod memory;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::{StorageConfig, DEFAULT_NAMESPACE};
use crate::error::{Result, StorageError};

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// File name of the long-lived area inside the storage directory.
pub const LOCAL_STORAGE_FILE: &str = "local_storage.json";

// == Storage Area Trait ==
/// A synchronous string key/value area with a finite quota.
pub trait StorageArea: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.
    ///
    /// Fails with `StorageError::QuotaExceeded` when the write would push
    /// the area past its quota; the previous value is left untouched.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str);

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Bytes used, counted as key length plus value length per item.
    fn usage_bytes(&self) -> usize;

    fn quota_bytes(&self) -> usize;
}

/// Bytes an item occupies against the quota.
pub(crate) fn item_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

pub(crate) fn usage_of(items: &HashMap<String, String>) -> usize {
    items.iter().map(|(k, v)| item_size(k, v)).sum()
}

/// Rejects a write that would not fit in `quota` bytes.
///
/// The size of the value being replaced is credited back before comparing.
pub(crate) fn check_quota(
    items: &HashMap<String, String>,
    key: &str,
    value: &str,
    quota: usize,
) -> Result<()> {
    let replaced = items.get(key).map(|old| item_size(key, old)).unwrap_or(0);
    let used = usage_of(items).saturating_sub(replaced);
    let available = quota.saturating_sub(used);
    let required = item_size(key, value);

    if required > available {
        return Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            required,
            available,
        });
    }
    Ok(())
}

// == Storage Host ==
/// The storage areas available to this process.
///
/// `session` is scoped to the running process; `local` outlives it. Either
/// may be missing, for example when running outside the environment that
/// provides durable storage. `namespace` is the deployment-wide prefix given
/// to persistent caches created without an explicit one.
#[derive(Clone)]
pub struct StorageHost {
    session: Option<Arc<dyn StorageArea>>,
    local: Option<Arc<dyn StorageArea>>,
    namespace: String,
}

impl StorageHost {
    pub fn new(
        session: Option<Arc<dyn StorageArea>>,
        local: Option<Arc<dyn StorageArea>>,
    ) -> Self {
        Self {
            session,
            local,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Replaces the default namespace of persistent caches on this host.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// A host without any storage areas.
    pub fn unavailable() -> Self {
        Self::new(None, None)
    }

    /// A host whose areas both live in process memory.
    pub fn in_memory(quota_bytes: usize) -> Self {
        Self::new(
            Some(Arc::new(MemoryStorage::new(quota_bytes))),
            Some(Arc::new(MemoryStorage::new(quota_bytes))),
        )
    }

    /// Opens the areas described by the configuration.
    ///
    /// The session area is always in memory. The local area is file-backed
    /// when a storage directory is configured; if it cannot be opened the
    /// failure is logged and the area is left unavailable.
    pub fn from_config(config: &StorageConfig) -> Self {
        let session: Arc<dyn StorageArea> = Arc::new(MemoryStorage::new(config.quota_bytes));

        let local = match open_local(config) {
            Ok(Some(storage)) => {
                info!(path = %storage.path().display(), "local storage area opened");
                Some(Arc::new(storage) as Arc<dyn StorageArea>)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "local storage area unavailable");
                None
            }
        };

        Self::new(Some(session), local).with_namespace(config.namespace.clone())
    }

    pub fn session(&self) -> Option<&Arc<dyn StorageArea>> {
        self.session.as_ref()
    }

    pub fn local(&self) -> Option<&Arc<dyn StorageArea>> {
        self.local.as_ref()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Default for StorageHost {
    fn default() -> Self {
        Self::unavailable()
    }
}

impl fmt::Debug for StorageHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageHost")
            .field("session", &self.session.is_some())
            .field("local", &self.local.is_some())
            .field("namespace", &self.namespace)
            .finish()
    }
}

fn open_local(config: &StorageConfig) -> anyhow::Result<Option<FileStorage>> {
    let Some(dir) = &config.storage_dir else {
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("creating storage directory {}", dir.display()))?;

    let path = dir.join(LOCAL_STORAGE_FILE);
    let storage = FileStorage::open(&path, config.quota_bytes)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(Some(storage))
}
