//! Merkle-block synchronization.
//!
//! [`ScanRangeTracker`] records which heights each key has been scanned over,
//! [`BatchIndex`] answers "which block proved this transaction" for the last
//! two batches, and [`MerkleBlockSync`] drives the request/response cycle
//! against one peer.

pub mod batch_index;
pub mod merkle_blocks;
pub mod scan_range;

pub use batch_index::BatchIndex;
pub use merkle_blocks::{
    BatchState, MerkleBlockOutcome, MerkleBlockSync, MerkleBlocksProgress, SyncCommand,
    SyncHandle, WatchdogAction,
};
pub use scan_range::{ScanKey, ScanRange, ScanRangeTracker};
