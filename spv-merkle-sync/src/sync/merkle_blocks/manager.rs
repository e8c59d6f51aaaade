//! Merkle-block sync manager.
//!
//! Walks every watched key's scan range outward in fixed-size batches,
//! requesting filtered blocks from one peer and indexing the transactions
//! each returned merkle block proves.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bitcoin::BlockHash;
use tokio::sync::RwLock;

use super::progress::MerkleBlocksProgress;
use super::state::BatchState;
use crate::config::SyncConfig;
use crate::error::{SpvError, SyncError, SyncResult};
use crate::merkle::{MerkleProofExtractor, TransactionExtractor};
use crate::network::PeerConnection;
use crate::storage::{BlockStorage, KeyStorage};
use crate::sync::{BatchIndex, ScanKey, ScanRangeTracker};
use crate::types::BlockInfo;

/// Merkle-block sync manager.
///
/// At most one batch is in flight at any time. A batch is the set of blocks
/// requested during one scheduling decision. The next decision only runs
/// after every block of the current batch has been answered.
///
/// Generic over:
/// - `S: BlockStorage` for height lookups of stored headers
/// - `K: KeyStorage` for loading and persisting key scan ranges
/// - `P: PeerConnection` for sending getdata requests
/// - `X: TransactionExtractor` for reading matched txids out of merkle blocks
pub struct MerkleBlockSync<S, K, P, X = MerkleProofExtractor>
where
    S: BlockStorage,
    K: KeyStorage,
    P: PeerConnection,
    X: TransactionExtractor,
{
    pub(super) config: SyncConfig,
    /// Stored block headers (for height range queries and the tip).
    pub(super) block_storage: Arc<RwLock<S>>,
    /// Key store the scan ranges are loaded from and saved to.
    pub(super) key_storage: Arc<RwLock<K>>,
    pub(super) peer: P,
    pub(super) extractor: X,
    /// Working copy of the keys being scanned.
    pub(super) tracker: ScanRangeTracker,
    /// Blocks requested in the current batch that have not arrived yet.
    pub(super) outstanding: HashMap<BlockHash, BlockInfo>,
    /// Txid to block lookup for the current and previous batch.
    pub(super) index: BatchIndex,
    pub(super) state: BatchState,
    pub(super) progress: MerkleBlocksProgress,
}

impl<S, K, P, X> MerkleBlockSync<S, K, P, X>
where
    S: BlockStorage,
    K: KeyStorage,
    P: PeerConnection,
    X: TransactionExtractor,
{
    /// Create a new sync manager. Keys are not loaded until [`initialize`].
    ///
    /// [`initialize`]: Self::initialize
    pub fn new(
        config: SyncConfig,
        block_storage: Arc<RwLock<S>>,
        key_storage: Arc<RwLock<K>>,
        peer: P,
        extractor: X,
    ) -> Result<Self, SpvError> {
        config.validate().map_err(SpvError::Config)?;

        Ok(Self {
            config,
            block_storage,
            key_storage,
            peer,
            extractor,
            tracker: ScanRangeTracker::default(),
            outstanding: HashMap::new(),
            index: BatchIndex::new(),
            state: BatchState::Idle,
            progress: MerkleBlocksProgress::default(),
        })
    }

    /// Load the keys to scan from key storage.
    ///
    /// Refused while a batch is outstanding.
    pub async fn initialize(&mut self) -> SyncResult<()> {
        if self.state.is_awaiting() {
            return Err(SyncError::SyncInProgress);
        }

        let keys = self.key_storage.read().await.load_keys().await?;
        tracing::info!(
            "Loaded {} keys ({} not yet scanned)",
            keys.len(),
            keys.iter().filter(|k| !k.is_started()).count()
        );

        self.tracker.set_keys(keys);
        self.refresh_scanned();
        Ok(())
    }

    /// Replace the keys to scan without going through key storage.
    pub fn set_keys(&mut self, keys: Vec<ScanKey>) -> SyncResult<()> {
        if self.state.is_awaiting() {
            return Err(SyncError::SyncInProgress);
        }
        self.tracker.set_keys(keys);
        self.refresh_scanned();
        Ok(())
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn progress(&self) -> &MerkleBlocksProgress {
        &self.progress
    }

    pub fn keys(&self) -> &[ScanKey] {
        self.tracker.keys()
    }

    pub fn batch_index(&self) -> &BatchIndex {
        &self.index
    }

    /// Number of blocks of the current batch still unanswered.
    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_outstanding(&self, hash: &BlockHash) -> bool {
        self.outstanding.contains_key(hash)
    }

    /// Drop the outstanding batch and both index generations.
    ///
    /// Key ranges are kept as they are; anything not persisted yet is
    /// rescanned by the next session.
    pub fn discard_batch(&mut self) {
        if !self.outstanding.is_empty() {
            tracing::info!(
                "Discarding {} outstanding merkle block requests",
                self.outstanding.len()
            );
        }
        self.outstanding.clear();
        self.index.clear();
        self.state = BatchState::Idle;
    }

    /// Save the current key ranges. Failures are logged and reported as `false`.
    pub(super) async fn persist_keys(&self) -> bool {
        let result = self.key_storage.write().await.persist_keys(self.tracker.keys()).await;
        match result {
            Ok(()) => {
                tracing::debug!(
                    "Saved scan ranges for {} keys ({}..={})",
                    self.tracker.len(),
                    self.tracker.min_height_checked(),
                    self.tracker.max_height_checked()
                );
                true
            }
            Err(e) => {
                tracing::error!("Failed to save key scan ranges: {}", e);
                false
            }
        }
    }

    pub(super) fn refresh_scanned(&mut self) {
        self.progress
            .update_scanned(self.tracker.min_height_checked(), self.tracker.max_height_checked());
    }
}

impl<S, K, P, X> fmt::Debug for MerkleBlockSync<S, K, P, X>
where
    S: BlockStorage,
    K: KeyStorage,
    P: PeerConnection,
    X: TransactionExtractor,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleBlockSync")
            .field("state", &self.state)
            .field("keys", &self.tracker.len())
            .field("outstanding", &self.outstanding.len())
            .field("progress", &self.progress)
            .finish()
    }
}
