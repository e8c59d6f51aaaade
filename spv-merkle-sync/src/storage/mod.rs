//! Storage abstraction for merkle-block sync.
//!
//! Block headers and key records are owned by external stores; sync reads
//! block locations from a [`BlockStorage`] and checkpoints key scan ranges
//! through a [`KeyStorage`].

pub(crate) mod io;

mod keys;
mod memory;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::sync::ScanKey;
use crate::types::{BlockHeight, BlockInfo};

pub use keys::JsonKeyStorage;
pub use memory::MemoryStorage;

/// Read access to the local block header chain.
#[async_trait]
pub trait BlockStorage: Send + Sync {
    /// Blocks between `start` and `end`, both inclusive.
    ///
    /// When `start > end` the blocks are returned in descending height order.
    /// Heights the store does not know are skipped.
    async fn get_blocks_in_height_range(
        &self,
        start: BlockHeight,
        end: BlockHeight,
    ) -> StorageResult<Vec<BlockInfo>>;

    /// The current chain tip.
    async fn get_recent_block(&self) -> StorageResult<BlockInfo>;
}

/// Durable home of the wallet's key records.
#[async_trait]
pub trait KeyStorage: Send + Sync {
    async fn load_keys(&self) -> StorageResult<Vec<ScanKey>>;

    /// Replace the stored scan ranges with `keys`.
    async fn persist_keys(&mut self, keys: &[ScanKey]) -> StorageResult<()>;
}
