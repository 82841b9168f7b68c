//! File-backed storage area that outlives the process.
//!
//! The whole area is one JSON object on disk. Every write rewrites the file
//! through a temporary sibling followed by a rename, so the cost of a write
//! grows with the size of the area.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::storage::{check_quota, usage_of, StorageArea};

/// Quota-limited string map persisted to a JSON file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<HashMap<String, String>>,
    quota_bytes: usize,
}

impl FileStorage {
    /// Opens the area at `path`, loading existing items if the file exists.
    ///
    /// A missing or empty file starts an empty area. A file that is not a
    /// JSON string map is an error.
    pub fn open(path: impl AsRef<Path>, quota_bytes: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let items = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
            quota_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageArea for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock();
        check_quota(&items, key, value, self.quota_bytes)?;

        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&items) {
            // Keep memory in step with the file
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.items.lock();
        if items.remove(key).is_some() {
            if let Err(err) = self.persist(&items) {
                warn!(key, error = %err, "failed to persist storage removal");
            }
        }
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
