//! Handling of incoming merkle blocks.

use bitcoin::{BlockHash, MerkleBlock};

use super::manager::MerkleBlockSync;
use super::state::BatchState;
use crate::merkle::TransactionExtractor;
use crate::network::PeerConnection;
use crate::storage::{BlockStorage, KeyStorage};

/// What happened to one incoming merkle block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerkleBlockOutcome {
    /// The block was not part of the outstanding batch and was dropped.
    Unsolicited(BlockHash),
    /// The block was accepted and `remaining` blocks are still outstanding.
    Accepted {
        remaining: usize,
    },
    /// The block completed the batch. `scheduled` blocks were requested by the
    /// follow-up decision.
    BatchComplete {
        scheduled: u32,
    },
}

impl<S, K, P, X> MerkleBlockSync<S, K, P, X>
where
    S: BlockStorage,
    K: KeyStorage,
    P: PeerConnection,
    X: TransactionExtractor,
{
    /// Handle a merkle block received from the peer.
    ///
    /// The block's height is applied to every key's scan range and the
    /// transactions it proves are indexed. When it was the last block of the
    /// batch the key ranges are saved and the next batch is scheduled, unless
    /// the block has no tracked height.
    pub async fn handle_merkle_block(&mut self, merkle_block: &MerkleBlock) -> MerkleBlockOutcome {
        let hash = merkle_block.header.block_hash();

        let Some(block) = self.outstanding.remove(&hash) else {
            tracing::warn!("Got merkle block {} that wasn't requested", hash);
            self.progress.add_unsolicited(1);
            return MerkleBlockOutcome::Unsolicited(hash);
        };
        self.progress.add_received(1);

        if let Some(height) = block.tracked_height() {
            let extended = self.tracker.apply_height(height);
            if extended > 0 {
                tracing::trace!("Height {} extended {} key ranges", height, extended);
                self.refresh_scanned();
            }
        }

        let txids = match self.extractor.transactions_from_merkle_block(merkle_block) {
            Ok(txids) => txids,
            Err(e) => {
                tracing::warn!("Ignoring transactions of merkle block {}: {}", block, e);
                Vec::new()
            }
        };
        if !txids.is_empty() {
            tracing::debug!("Merkle block {} proves {} transactions", block, txids.len());
            self.progress.add_transactions(txids.len() as u32);
        }
        for txid in txids {
            self.index.insert(txid, block);
        }

        if !self.outstanding.is_empty() {
            return MerkleBlockOutcome::Accepted {
                remaining: self.outstanding.len(),
            };
        }

        self.state = BatchState::Idle;
        self.progress.add_batch_completed();
        tracing::debug!("Merkle block batch complete: {}", self.progress);

        self.persist_keys().await;

        if block.tracked_height().is_none() {
            tracing::debug!("Batch completed by untracked block {}, not scheduling", hash);
            return MerkleBlockOutcome::BatchComplete {
                scheduled: 0,
            };
        }

        let scheduled = self.decide_next_batch().await;
        MerkleBlockOutcome::BatchComplete {
            scheduled,
        }
    }
}
