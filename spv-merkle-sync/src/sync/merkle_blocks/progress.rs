use std::fmt;
use std::time::Instant;

use crate::types::BlockHeight;

/// Progress of a merkle-block sync session.
#[derive(Debug, Clone, PartialEq)]
pub struct MerkleBlocksProgress {
    /// Lowest height every key has been scanned down to (0 = unknown).
    scanned_from: BlockHeight,
    /// Highest height every key has been scanned up to (0 = unknown).
    scanned_to: BlockHeight,
    /// Blocks requested from the peer, re-requests excluded.
    requested: u32,
    /// Merkle blocks received that belonged to the outstanding batch.
    received: u32,
    /// Merkle blocks received that nobody asked for.
    unsolicited: u32,
    /// Batches fully answered.
    batches_completed: u32,
    /// Re-requests sent for timed out batches.
    resent: u32,
    /// Batches given up after exhausting retries.
    abandoned: u32,
    /// Transactions indexed from received merkle blocks.
    transactions: u32,
    /// The last time anything changed.
    last_activity: Instant,
}

impl Default for MerkleBlocksProgress {
    fn default() -> Self {
        Self {
            scanned_from: 0,
            scanned_to: 0,
            requested: 0,
            received: 0,
            unsolicited: 0,
            batches_completed: 0,
            resent: 0,
            abandoned: 0,
            transactions: 0,
            last_activity: Instant::now(),
        }
    }
}

impl MerkleBlocksProgress {
    pub fn scanned_from(&self) -> BlockHeight {
        self.scanned_from
    }

    pub fn scanned_to(&self) -> BlockHeight {
        self.scanned_to
    }

    pub fn requested(&self) -> u32 {
        self.requested
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn unsolicited(&self) -> u32 {
        self.unsolicited
    }

    pub fn batches_completed(&self) -> u32 {
        self.batches_completed
    }

    pub fn resent(&self) -> u32 {
        self.resent
    }

    pub fn abandoned(&self) -> u32 {
        self.abandoned
    }

    pub fn transactions(&self) -> u32 {
        self.transactions
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn update_scanned(&mut self, from: BlockHeight, to: BlockHeight) {
        self.scanned_from = from;
        self.scanned_to = to;
        self.bump_last_activity();
    }

    pub fn add_requested(&mut self, count: u32) {
        self.requested += count;
        self.bump_last_activity();
    }

    pub fn add_received(&mut self, count: u32) {
        self.received += count;
        self.bump_last_activity();
    }

    pub fn add_unsolicited(&mut self, count: u32) {
        self.unsolicited += count;
        self.bump_last_activity();
    }

    pub fn add_batch_completed(&mut self) {
        self.batches_completed += 1;
        self.bump_last_activity();
    }

    pub fn add_resent(&mut self) {
        self.resent += 1;
        self.bump_last_activity();
    }

    pub fn add_abandoned(&mut self) {
        self.abandoned += 1;
        self.bump_last_activity();
    }

    pub fn add_transactions(&mut self, count: u32) {
        self.transactions += count;
        self.bump_last_activity();
    }

    fn bump_last_activity(&mut self) {
        self.last_activity = Instant::now();
    }
}

impl fmt::Display for MerkleBlocksProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {}..={} | requested: {}, received: {}, unsolicited: {}, batches: {}, txs: {}, resent: {}, abandoned: {}",
            self.scanned_from,
            self.scanned_to,
            self.requested,
            self.received,
            self.unsolicited,
            self.batches_completed,
            self.transactions,
            self.resent,
            self.abandoned,
        )
    }
}
