//! Cache Entry Module
//!
//! Defines the unit of storage: a value plus its insertion time, lifetime
//! and hit counter.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cached value with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The stored value
    pub data: T,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Time to live in milliseconds
    pub ttl: u64,
    /// Number of successful reads
    pub hits: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a fresh entry stamped with the current time and zero hits.
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: current_timestamp_ms(),
            ttl: duration_to_ms(ttl),
            hits: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once strictly more than `ttl` milliseconds have
    /// elapsed since it was written, so a zero TTL survives reads made within
    /// the same millisecond.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) > self.ttl
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was written.
    pub fn age_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.timestamp)
    }

    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

pub(crate) fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
