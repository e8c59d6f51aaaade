//! Configuration for merkle-block sync.

use std::path::PathBuf;
use std::time::Duration;

use crate::network::message::MAX_INV_PER_MSG;

/// Blocks requested per batch.
pub const DEFAULT_BATCH_SIZE: u32 = 2000;

/// How long a batch may stay unanswered before it is re-requested.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Re-requests of one batch before it is abandoned.
pub const DEFAULT_MAX_REQUEST_RETRIES: u32 = 3;

/// How often the session checks for timed out batches.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for one merkle-block sync session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum number of new blocks requested per scheduling cycle.
    pub batch_size: u32,

    /// Time without a complete batch before the outstanding blocks are
    /// requested again.
    pub request_timeout: Duration,

    /// Number of re-requests before an unanswered batch is abandoned.
    pub max_request_retries: u32,

    /// Interval of the timeout watchdog in [`MerkleBlockSync::run`].
    ///
    /// [`MerkleBlockSync::run`]: crate::sync::MerkleBlockSync::run
    pub tick_interval: Duration,

    /// Path for persistent storage. Defaults to ./merkle-sync-storage
    pub storage_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_request_retries: DEFAULT_MAX_REQUEST_RETRIES,
            tick_interval: DEFAULT_TICK_INTERVAL,
            storage_path: PathBuf::from("./merkle-sync-storage"),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how often an unanswered batch is re-requested.
    pub fn with_max_request_retries(mut self, retries: u32) -> Self {
        self.max_request_retries = retries;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set storage path.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }

        if self.batch_size as usize > MAX_INV_PER_MSG {
            return Err(format!("batch_size must be <= {}", MAX_INV_PER_MSG));
        }

        if self.request_timeout.is_zero() {
            return Err("request_timeout must be > 0".to_string());
        }

        if self.tick_interval.is_zero() {
            return Err("tick_interval must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SyncConfig::default();
        assert_eq!(config.batch_size, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = SyncConfig::new()
            .with_batch_size(500)
            .with_request_timeout(Duration::from_secs(5))
            .with_max_request_retries(1)
            .with_tick_interval(Duration::from_millis(250))
            .with_storage_path("/tmp/merkle");

        assert_eq!(config.batch_size, 500);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_request_retries, 1);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.storage_path, PathBuf::from("/tmp/merkle"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(SyncConfig::new().with_batch_size(0).validate().is_err());
        assert!(SyncConfig::new().with_batch_size(MAX_INV_PER_MSG as u32 + 1).validate().is_err());
        assert!(SyncConfig::new().with_request_timeout(Duration::ZERO).validate().is_err());
        assert!(SyncConfig::new().with_tick_interval(Duration::ZERO).validate().is_err());
    }
}
