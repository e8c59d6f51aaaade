//! Common type definitions.

use std::fmt;

use bitcoin::BlockHash;

/// Block height as stored by the block storage collaborator.
pub type BlockHeight = u32;

/// A stored block, as far as merkle-block sync is concerned.
///
/// Height `0` marks a block without a tracked chain height. Such blocks are
/// requested and indexed like any other but never extend key scan ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockInfo {
    height: BlockHeight,
    hash: BlockHash,
}

impl BlockInfo {
    pub fn new(height: BlockHeight, hash: BlockHash) -> Self {
        Self {
            height,
            hash,
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.height
    }

    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    /// Height this block contributes to key scan ranges, `None` for the
    /// untracked sentinel.
    pub fn tracked_height(&self) -> Option<BlockHeight> {
        (self.height != 0).then_some(self.height)
    }
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (height {})", self.hash, self.height)
    }
}
