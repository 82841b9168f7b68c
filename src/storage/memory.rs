//! In-memory storage area, scoped to the running process.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::config::DEFAULT_STORAGE_QUOTA_BYTES;
use crate::error::Result;
use crate::storage::{check_quota, usage_of, StorageArea};

/// Quota-limited string map living in process memory.
#[derive(Debug)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: usize,
}

impl MemoryStorage {
    pub fn new(quota_bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota_bytes,
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_QUOTA_BYTES)
    }
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock();
        check_quota(&items, key, value, self.quota_bytes)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.lock().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.items.lock().keys().cloned().collect()
    }

    fn usage_bytes(&self) -> usize {
        usage_of(&self.items.lock())
    }

    fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }
}
