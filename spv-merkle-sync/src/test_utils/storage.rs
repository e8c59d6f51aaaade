use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::storage::{BlockStorage, KeyStorage, MemoryStorage};
use crate::sync::ScanKey;
use crate::types::{BlockHeight, BlockInfo};

/// Memory storage that counts calls and can be told to fail.
#[derive(Debug, Default)]
pub struct MockStorage {
    inner: MemoryStorage,
    range_queries: AtomicUsize,
    tip_queries: AtomicUsize,
    persists: usize,
    pub fail_range: bool,
    pub fail_tip: bool,
    pub fail_persist: bool,
}

impl MockStorage {
    pub fn new(blocks: impl IntoIterator<Item = BlockInfo>, keys: Vec<ScanKey>) -> Self {
        let mut inner = MemoryStorage::with_keys(keys);
        inner.store_blocks(blocks);
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn inner_mut(&mut self) -> &mut MemoryStorage {
        &mut self.inner
    }

    /// Keys as last persisted.
    pub fn stored_keys(&self) -> &[ScanKey] {
        self.inner.keys()
    }

    pub fn range_queries(&self) -> usize {
        self.range_queries.load(Ordering::SeqCst)
    }

    pub fn tip_queries(&self) -> usize {
        self.tip_queries.load(Ordering::SeqCst)
    }

    pub fn persists(&self) -> usize {
        self.persists
    }
}

#[async_trait]
impl BlockStorage for MockStorage {
    async fn get_blocks_in_height_range(
        &self,
        start: BlockHeight,
        end: BlockHeight,
    ) -> StorageResult<Vec<BlockInfo>> {
        self.range_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_range {
            return Err(StorageError::ReadFailed("range query failed".to_string()));
        }
        self.inner.get_blocks_in_height_range(start, end).await
    }

    async fn get_recent_block(&self) -> StorageResult<BlockInfo> {
        self.tip_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_tip {
            return Err(StorageError::ReadFailed("tip query failed".to_string()));
        }
        self.inner.get_recent_block().await
    }
}

#[async_trait]
impl KeyStorage for MockStorage {
    async fn load_keys(&self) -> StorageResult<Vec<ScanKey>> {
        self.inner.load_keys().await
    }

    async fn persist_keys(&mut self, keys: &[ScanKey]) -> StorageResult<()> {
        self.persists += 1;
        if self.fail_persist {
            return Err(StorageError::WriteFailed("persist failed".to_string()));
        }
        self.inner.persist_keys(keys).await
    }
}
