use std::collections::HashSet;

use bitcoin::{BlockHash, MerkleBlock, Txid};

use crate::error::{SyncError, SyncResult};
use crate::merkle::{MerkleProofExtractor, TransactionExtractor};

/// Verifies proofs like [`MerkleProofExtractor`] but rejects chosen blocks.
#[derive(Debug, Clone, Default)]
pub struct MockExtractor {
    rejected: HashSet<BlockHash>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(blocks: impl IntoIterator<Item = BlockHash>) -> Self {
        Self {
            rejected: blocks.into_iter().collect(),
        }
    }
}

impl TransactionExtractor for MockExtractor {
    fn transactions_from_merkle_block(&self, merkle_block: &MerkleBlock) -> SyncResult<Vec<Txid>> {
        let block_hash = merkle_block.header.block_hash();
        if self.rejected.contains(&block_hash) {
            return Err(SyncError::InvalidMerkleProof {
                block_hash,
                reason: "rejected by test".to_string(),
            });
        }
        MerkleProofExtractor.transactions_from_merkle_block(merkle_block)
    }
}
