//! Merkle-block transaction sync for SPV wallets.
//!
//! Given block headers already in storage and a set of wallet keys, this
//! library requests filtered blocks (`getdata` with `MSG_FILTERED_BLOCK`
//! entries) from a peer that has the wallet's bloom filter loaded, walks
//! every key's scanned height range outward in fixed-size batches, and
//! remembers which block proved which transaction.
//!
//! - Resumes from per-key scan ranges persisted after every batch
//! - Scans new blocks above the tip first, then backfills toward genesis
//! - Keeps at most one batch in flight and re-requests stalled batches
//! - Answers txid to block lookups for the last two batches
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use spv_merkle_sync::network::RequestSender;
//! use spv_merkle_sync::storage::{JsonKeyStorage, MemoryStorage};
//! use spv_merkle_sync::{MerkleBlockSync, MerkleProofExtractor, SyncConfig, SyncHandle};
//! use tokio::sync::{mpsc, RwLock};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::new().with_storage_path("./.tmp/merkle-sync");
//!
//!     let headers = Arc::new(RwLock::new(MemoryStorage::new()));
//!     let keys = Arc::new(RwLock::new(JsonKeyStorage::open(&config.storage_path)));
//!
//!     // Outgoing messages for the peer connection, incoming ones from it.
//!     let (peer, _outgoing) = RequestSender::channel();
//!     let (_incoming_tx, incoming) = mpsc::unbounded_channel();
//!
//!     let mut sync = MerkleBlockSync::new(config, headers, keys, peer, MerkleProofExtractor)?;
//!     sync.initialize().await?;
//!
//!     let (_handle, commands) = SyncHandle::channel();
//!     sync.run(incoming, commands, CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub mod config;
pub mod error;
pub mod logging;
pub mod merkle;
pub mod network;
pub mod storage;
pub mod sync;
pub mod types;

pub use config::SyncConfig;
pub use error::{
    LoggingError, LoggingResult, NetworkError, SpvError, StorageError, SyncError, SyncResult,
};
pub use logging::{init_console_logging, init_logging, LogFileConfig, LoggingConfig, LoggingGuard};
pub use merkle::{MerkleProofExtractor, TransactionExtractor};
pub use sync::{
    BatchState, MerkleBlockOutcome, MerkleBlockSync, MerkleBlocksProgress, ScanKey, SyncCommand,
    SyncHandle, WatchdogAction,
};
pub use tracing::level_filters::LevelFilter;
pub use types::{BlockHeight, BlockInfo};

pub use bitcoin::{BlockHash, MerkleBlock, Txid};

/// Current version of the spv-merkle-sync library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
