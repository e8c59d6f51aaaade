//! Transaction extraction from merkle blocks.

use bitcoin::{MerkleBlock, Txid};

use crate::error::{SyncError, SyncResult};

/// Resolves the transactions a merkle block proves to be in its block.
pub trait TransactionExtractor: Send + Sync {
    fn transactions_from_merkle_block(&self, merkle_block: &MerkleBlock) -> SyncResult<Vec<Txid>>;
}

/// Walks the BIP37 partial merkle tree and returns the matched txids.
///
/// The tree must hash up to the merkle root in the block header, otherwise
/// the block is rejected with [`SyncError::InvalidMerkleProof`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MerkleProofExtractor;

impl TransactionExtractor for MerkleProofExtractor {
    fn transactions_from_merkle_block(&self, merkle_block: &MerkleBlock) -> SyncResult<Vec<Txid>> {
        let mut matches = Vec::new();
        let mut indexes = Vec::new();
        merkle_block.extract_matches(&mut matches, &mut indexes).map_err(|e| {
            SyncError::InvalidMerkleProof {
                block_hash: merkle_block.header.block_hash(),
                reason: e.to_string(),
            }
        })?;
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::block::{Header, Version};
    use bitcoin::hashes::Hash;
    use bitcoin::merkle_tree;
    use bitcoin::{BlockHash, CompactTarget, TxMerkleNode};

    fn txids() -> Vec<Txid> {
        (1..=5u8).map(|n| Txid::from_byte_array([n; 32])).collect()
    }

    fn header_for(txids: &[Txid]) -> Header {
        let root = merkle_tree::calculate_root(txids.iter().copied()).unwrap();
        Header {
            version: Version::ONE,
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::from_raw_hash(root.to_raw_hash()),
            time: 1,
            bits: CompactTarget::from_consensus(0x207fffff),
            nonce: 0,
        }
    }

    #[test]
    fn test_extracts_matched_transactions() {
        let all = txids();
        let wanted = [all[1], all[4]];
        let header = header_for(&all);
        let merkle_block =
            MerkleBlock::from_header_txids_with_predicate(&header, &all, |t| wanted.contains(t));

        let found = MerkleProofExtractor.transactions_from_merkle_block(&merkle_block).unwrap();
        assert_eq!(found, wanted.to_vec());
    }

    #[test]
    fn test_no_matches_yields_empty_list() {
        let all = txids();
        let header = header_for(&all);
        let merkle_block = MerkleBlock::from_header_txids_with_predicate(&header, &all, |_| false);

        let found = MerkleProofExtractor.transactions_from_merkle_block(&merkle_block).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_rejects_proof_for_other_root() {
        let all = txids();
        let mut header = header_for(&all);
        header.merkle_root = TxMerkleNode::all_zeros();
        let merkle_block = MerkleBlock::from_header_txids_with_predicate(&header, &all, |_| true);

        let err = MerkleProofExtractor.transactions_from_merkle_block(&merkle_block).unwrap_err();
        assert!(matches!(err, SyncError::InvalidMerkleProof { .. }));
    }
}
