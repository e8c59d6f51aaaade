//! Error types for merkle-block synchronization.

use std::io;
use thiserror::Error;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum SpvError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

/// Logging-related errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] io::Error),

    #[error("Subscriber initialization failed: {0}")]
    SubscriberInit(String),

    #[error("Log rotation failed: {0}")]
    RotationFailed(String),
}

/// Errors raised while talking to the peer.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Not connected")]
    NotConnected,

    #[error("Failed to build message: {0}")]
    MessageConstruction(String),
}

/// Storage-related errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Data not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Synchronization-related errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A batch is still outstanding.
    #[error("Sync already in progress")]
    SyncInProgress,

    #[error("Invalid sync state: {0}")]
    InvalidState(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The peer sent a merkle proof that does not match its header.
    #[error("Invalid merkle proof for block {block_hash}: {reason}")]
    InvalidMerkleProof {
        block_hash: bitcoin::BlockHash,
        reason: String,
    },

    /// A key carried min/max checks that cannot describe a contiguous range.
    #[error("Invalid scan range for key {key}: min_check={min_check}, max_check={max_check}")]
    InvalidScanRange {
        key: String,
        min_check: u32,
        max_check: u32,
    },
}

impl SyncError {
    /// Returns a static string representing the error category.
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::SyncInProgress | SyncError::InvalidState(_) => "state",
            SyncError::Network(_) => "network",
            SyncError::Storage(_) => "storage",
            SyncError::InvalidMerkleProof {
                ..
            } => "validation",
            SyncError::InvalidScanRange {
                ..
            } => "keys",
        }
    }
}

impl From<NetworkError> for SyncError {
    fn from(err: NetworkError) -> Self {
        SyncError::Network(err.to_string())
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

/// Type alias for Result with SpvError.
pub type Result<T> = std::result::Result<T, SpvError>;

/// Type alias for network operation results.
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Type alias for storage operation results.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Type alias for sync operation results.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Type alias for logging operation results.
pub type LoggingResult<T> = std::result::Result<T, LoggingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_categories() {
        assert_eq!(SyncError::SyncInProgress.category(), "state");
        assert_eq!(
            SyncError::InvalidScanRange {
                key: "k".into(),
                min_check: 0,
                max_check: 5,
            }
            .category(),
            "keys"
        );
    }

    #[test]
    fn test_storage_error_converts_into_sync_error() {
        let err: SyncError = StorageError::NotFound("tip".into()).into();
        assert!(matches!(err, SyncError::Storage(ref msg) if msg.contains("tip")));
    }

    #[test]
    fn test_spv_error_from_network_error() {
        let err: SpvError = NetworkError::NotConnected.into();
        assert_eq!(err.to_string(), "Network error: Not connected");
    }
}
