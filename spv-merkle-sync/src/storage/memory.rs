//! In-memory storage implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bitcoin::BlockHash;

use crate::error::{StorageError, StorageResult};
use crate::storage::{BlockStorage, KeyStorage};
use crate::sync::ScanKey;
use crate::types::{BlockHeight, BlockInfo};

/// Keeps blocks and keys in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blocks: BTreeMap<BlockHeight, BlockInfo>,
    keys: Vec<ScanKey>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: Vec<ScanKey>) -> Self {
        Self {
            blocks: BTreeMap::new(),
            keys,
        }
    }

    /// Store a block at `height`, replacing any block already there.
    pub fn store_block(&mut self, height: BlockHeight, hash: BlockHash) {
        self.blocks.insert(height, BlockInfo::new(height, hash));
    }

    pub fn store_blocks(&mut self, blocks: impl IntoIterator<Item = BlockInfo>) {
        for block in blocks {
            self.blocks.insert(block.height(), block);
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn keys(&self) -> &[ScanKey] {
        &self.keys
    }
}

#[async_trait]
impl BlockStorage for MemoryStorage {
    async fn get_blocks_in_height_range(
        &self,
        start: BlockHeight,
        end: BlockHeight,
    ) -> StorageResult<Vec<BlockInfo>> {
        let blocks = if start <= end {
            self.blocks.range(start..=end).map(|(_, b)| *b).collect()
        } else {
            self.blocks.range(end..=start).rev().map(|(_, b)| *b).collect()
        };
        Ok(blocks)
    }

    async fn get_recent_block(&self) -> StorageResult<BlockInfo> {
        self.blocks
            .values()
            .next_back()
            .copied()
            .ok_or_else(|| StorageError::NotFound("no blocks stored".to_string()))
    }
}

#[async_trait]
impl KeyStorage for MemoryStorage {
    async fn load_keys(&self) -> StorageResult<Vec<ScanKey>> {
        Ok(self.keys.clone())
    }

    async fn persist_keys(&mut self, keys: &[ScanKey]) -> StorageResult<()> {
        self.keys = keys.to_vec();
        Ok(())
    }
}
