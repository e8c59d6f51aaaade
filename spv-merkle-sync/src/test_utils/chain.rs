use std::ops::RangeInclusive;

use bitcoin::block::{Header, Version};
use bitcoin::hashes::Hash;
use bitcoin::{merkle_tree, BlockHash, CompactTarget, MerkleBlock, TxMerkleNode, Txid};

use crate::types::{BlockHeight, BlockInfo};

/// Transactions in every test block.
pub const TXS_PER_BLOCK: u8 = 3;

/// Deterministic txid of the `index`th transaction of the block at `height`.
pub fn test_txid(height: BlockHeight, index: u8) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&height.to_le_bytes());
    bytes[4] = index;
    bytes[31] = 0xaa;
    Txid::from_byte_array(bytes)
}

pub fn block_txids(height: BlockHeight) -> Vec<Txid> {
    (0..TXS_PER_BLOCK).map(|index| test_txid(height, index)).collect()
}

/// Header of the test block at `height`. Headers are not linked; each one
/// commits to [`block_txids`] for its height.
pub fn test_header(height: BlockHeight) -> Header {
    let root = merkle_tree::calculate_root(block_txids(height).into_iter())
        .map(|root| TxMerkleNode::from_raw_hash(root.to_raw_hash()))
        .unwrap_or_else(TxMerkleNode::all_zeros);

    Header {
        version: Version::ONE,
        prev_blockhash: BlockHash::all_zeros(),
        merkle_root: root,
        time: 1_600_000_000 + height,
        bits: CompactTarget::from_consensus(0x207fffff),
        nonce: height,
    }
}

pub fn test_block(height: BlockHeight) -> BlockInfo {
    BlockInfo::new(height, test_header(height).block_hash())
}

pub fn test_chain(heights: RangeInclusive<BlockHeight>) -> Vec<BlockInfo> {
    heights.map(test_block).collect()
}

/// Merkle block for `height` proving the transactions `matches` selects.
pub fn merkle_block_with(height: BlockHeight, matches: impl Fn(&Txid) -> bool) -> MerkleBlock {
    MerkleBlock::from_header_txids_with_predicate(
        &test_header(height),
        &block_txids(height),
        matches,
    )
}

/// Merkle block for `height` proving none of its transactions.
pub fn merkle_block_at(height: BlockHeight) -> MerkleBlock {
    merkle_block_with(height, |_| false)
}

/// Merkle block for `height` proving every transaction.
pub fn merkle_block_matching_all(height: BlockHeight) -> MerkleBlock {
    merkle_block_with(height, |_| true)
}
