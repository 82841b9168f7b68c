//! Error types for the caching layer
//!
//! Only storage areas produce errors. The caches themselves swallow them
//! (after logging), so callers of `Cache` never see a `StorageError`.

use thiserror::Error;

// == Storage Error Enum ==
/// Failure reported by a host storage area.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would push the area past its byte quota
    #[error("Quota exceeded writing '{key}': {required} bytes required, {available} available")]
    QuotaExceeded {
        key: String,
        required: usize,
        available: usize,
    },

    /// Backing file could not be read or written
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file holds data that is not a string map
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns true when the failure is a quota rejection.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

// == Result Type Alias ==
/// Convenience Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_message() {
        let err = StorageError::QuotaExceeded {
            key: "community:feed".to_string(),
            required: 120,
            available: 10,
        };
        assert!(err.is_quota_exceeded());
        let msg = err.to_string();
        assert!(msg.contains("community:feed"));
        assert!(msg.contains("120"));
    }

    #[test]
    fn test_io_error_is_not_quota() {
        let err: StorageError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(!err.is_quota_exceeded());
    }
}
