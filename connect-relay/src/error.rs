//! Error types for connect-relay.

use connect_types::{DeviceId, RoomId};

/// Main error type for connect-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Device has never been seen by the registry.
    #[error("device not found: {device_id}")]
    DeviceNotFound {
        /// The unknown device.
        device_id: DeviceId,
    },

    /// Room has no log.
    #[error("room not found: {room_id}")]
    RoomNotFound {
        /// The unknown room.
        room_id: RoomId,
    },

    /// Request was rejected before touching any state.
    #[error("{reason}")]
    Validation {
        /// Why the request is invalid.
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Whether the error means "nothing there" rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RelayError::DeviceNotFound { .. }
                | RelayError::RoomNotFound { .. }
                | RelayError::Storage(StorageError::NotFound { .. })
                | RelayError::Storage(StorageError::InvalidReference { .. })
        )
    }
}

/// Blob storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No blob under this reference.
    #[error("file not found: {reference}")]
    NotFound {
        /// The missing storage reference.
        reference: String,
    },

    /// Reference could escape the storage root.
    #[error("invalid storage reference: {reference}")]
    InvalidReference {
        /// The rejected storage reference.
        reference: String,
    },
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_shows_reason_only() {
        let err = RelayError::Validation {
            reason: "Need min 2 nodes".to_string(),
        };
        assert_eq!(err.to_string(), "Need min 2 nodes");
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_classification() {
        let err = RelayError::DeviceNotFound {
            device_id: DeviceId::new("ghost"),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "device not found: ghost");

        let err = RelayError::from(StorageError::NotFound {
            reference: "abcd_x".to_string(),
        });
        assert!(err.is_not_found());

        let err = RelayError::from(StorageError::Io(std::io::Error::other("disk full")));
        assert!(!err.is_not_found());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RelayError>();
    }
}
