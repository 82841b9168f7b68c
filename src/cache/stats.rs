//! Cache Statistics Module
//!
//! Diagnostic snapshot of a cache instance: entry count, mean hit count and
//! per-key details.

use serde::Serialize;

use crate::cache::CacheEntry;

// == Entry Stats ==
/// Diagnostic view of one stored key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStats {
    /// Caller-facing key (without any storage namespace)
    pub key: String,
    /// Successful reads since the entry was written
    pub hits: u64,
    /// Milliseconds since the entry was written
    pub age_ms: u64,
}

impl EntryStats {
    /// Builds the stats row for an entry.
    pub fn from_entry<T>(key: impl Into<String>, entry: &CacheEntry<T>) -> Self {
        Self {
            key: key.into(),
            hits: entry.hits,
            age_ms: entry.age_ms(),
        }
    }
}

// == Cache Stats ==
/// Snapshot returned by `Cache::stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entries currently stored
    pub size: usize,
    /// Mean hit count across the listed entries
    pub hit_rate: f64,
    /// One row per stored key
    pub entries: Vec<EntryStats>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates stats from the given rows.
    ///
    /// `size` is the raw entry count of the instance, which can differ from
    /// `entries.len()` when some stored values could not be parsed.
    pub fn new(size: usize, entries: Vec<EntryStats>) -> Self {
        let hit_rate = mean_hits(&entries);
        Self {
            size,
            hit_rate,
            entries,
        }
    }

    /// Looks up the row of a key.
    pub fn entry(&self, key: &str) -> Option<&EntryStats> {
        self.entries.iter().find(|e| e.key == key)
    }
}

// == Hit Rate ==
/// Returns the mean hit count, or 0.0 for no entries.
fn mean_hits(entries: &[EntryStats]) -> f64 {
    if entries.is_empty() {
        0.0
    } else {
        let total: u64 = entries.iter().map(|e| e.hits).sum();
        total as f64 / entries.len() as f64
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, hits: u64) -> EntryStats {
        EntryStats {
            key: key.to_string(),
            hits,
            age_ms: 0,
        }
    }

    #[test]
    fn test_stats_empty() {
        let stats = CacheStats::new(0, Vec::new());
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hit_rate, 0.0);
        assert!(stats.entries.is_empty());
    }

    #[test]
    fn test_hit_rate_is_mean_hits() {
        let stats = CacheStats::new(3, vec![row("a", 1), row("b", 2), row("c", 6)]);
        assert_eq!(stats.hit_rate, 3.0);
    }

    #[test]
    fn test_entry_lookup() {
        let stats = CacheStats::new(2, vec![row("a", 1), row("b", 4)]);
        assert_eq!(stats.entry("b").map(|e| e.hits), Some(4));
        assert!(stats.entry("missing").is_none());
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CacheStats::new(1, vec![row("feed", 2)]);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"hitRate\""));
        assert!(json.contains("\"ageMs\""));
        assert!(json.contains("feed"));
    }
}
