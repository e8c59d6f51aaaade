//! Two-generation transaction index.
//!
//! Maps the txids proven by merkle blocks of the current batch to the block
//! that carried them. When a new batch starts the current generation becomes
//! the previous one and the old previous generation is dropped, so lookups
//! cover at most the current and the immediately preceding batch.

use std::collections::HashMap;

use bitcoin::Txid;

use crate::types::BlockInfo;

#[derive(Debug, Default)]
pub struct BatchIndex {
    current: HashMap<Txid, BlockInfo>,
    previous: HashMap<Txid, BlockInfo>,
}

impl BatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a txid in the current generation. Later inserts for the same
    /// txid replace earlier ones.
    pub fn insert(&mut self, txid: Txid, block: BlockInfo) {
        self.current.insert(txid, block);
    }

    /// Look up the block for a txid, current generation first.
    pub fn get(&self, txid: &Txid) -> Option<&BlockInfo> {
        self.current.get(txid).or_else(|| self.previous.get(txid))
    }

    /// Demote the current generation and start an empty one.
    ///
    /// The two maps are swapped and the new current one cleared, so the
    /// allocations are reused instead of growing history.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
    }

    /// Drop both generations.
    pub fn clear(&mut self) {
        self.current.clear();
        self.previous.clear();
    }

    pub fn current_len(&self) -> usize {
        self.current.len()
    }

    pub fn previous_len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::BlockHash;

    fn txid(n: u8) -> Txid {
        Txid::from_byte_array([n; 32])
    }

    fn block(height: u32) -> BlockInfo {
        BlockInfo::new(height, BlockHash::from_byte_array([height as u8; 32]))
    }

    #[test]
    fn test_lookup_prefers_current_generation() {
        let mut index = BatchIndex::new();
        index.insert(txid(1), block(10));
        index.rotate();
        index.insert(txid(1), block(20));

        assert_eq!(index.get(&txid(1)).map(|b| b.height()), Some(20));
    }

    #[test]
    fn test_previous_generation_still_answers() {
        let mut index = BatchIndex::new();
        index.insert(txid(1), block(10));
        index.rotate();

        assert_eq!(index.current_len(), 0);
        assert_eq!(index.previous_len(), 1);
        assert_eq!(index.get(&txid(1)).map(|b| b.height()), Some(10));
    }

    #[test]
    fn test_two_rotations_forget_txid() {
        let mut index = BatchIndex::new();
        index.insert(txid(1), block(10));
        index.rotate();
        index.insert(txid(2), block(11));
        index.rotate();

        assert!(index.get(&txid(1)).is_none());
        assert_eq!(index.get(&txid(2)).map(|b| b.height()), Some(11));
    }

    #[test]
    fn test_last_write_wins_within_batch() {
        let mut index = BatchIndex::new();
        index.insert(txid(3), block(30));
        index.insert(txid(3), block(31));

        assert_eq!(index.current_len(), 1);
        assert_eq!(index.get(&txid(3)).map(|b| b.height()), Some(31));
    }

    #[test]
    fn test_clear_drops_both_generations() {
        let mut index = BatchIndex::new();
        index.insert(txid(1), block(1));
        index.rotate();
        index.insert(txid(2), block(2));
        index.clear();

        assert!(index.is_empty());
        assert!(index.get(&txid(1)).is_none());
    }
}
