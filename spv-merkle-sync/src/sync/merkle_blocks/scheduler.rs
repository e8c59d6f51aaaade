//! Batch scheduling.
//!
//! One scheduling decision fills up to `batch_size` requests from three
//! phases, in order:
//!
//! 1. bootstrap: no key has a range yet, start at the tip and walk down
//! 2. forward: blocks above the highest height every key has reached
//! 3. backfill: blocks below the lowest height every key has reached
//!
//! Later phases only get whatever room the earlier ones left.

use std::collections::HashSet;
use std::time::Instant;

use super::manager::MerkleBlockSync;
use super::state::BatchState;
use crate::error::SyncResult;
use crate::merkle::TransactionExtractor;
use crate::network::{GetDataBuilder, PeerConnection};
use crate::storage::{BlockStorage, KeyStorage};
use crate::types::{BlockHeight, BlockInfo};

/// Height range of the first batch when nothing has been scanned yet: the tip
/// down to `batch_size` blocks below it, clamped at 0.
pub(crate) fn bootstrap_range(tip: BlockHeight, batch_size: u32) -> (BlockHeight, BlockHeight) {
    (tip, tip.saturating_sub(batch_size))
}

/// Height range above `max_checked`, capped at the tip and at the room left
/// in the batch.
pub(crate) fn forward_range(
    max_checked: BlockHeight,
    tip: BlockHeight,
    batch_size: u32,
    queued: u32,
) -> (BlockHeight, BlockHeight) {
    let room = batch_size.saturating_sub(queued);
    (max_checked.saturating_add(1), max_checked.saturating_add(room).min(tip))
}

/// Height range below `min_checked`, walking down toward genesis. Clamped at 0.
pub(crate) fn backfill_range(
    min_checked: BlockHeight,
    batch_size: u32,
    queued: u32,
) -> (BlockHeight, BlockHeight) {
    (min_checked, min_checked.saturating_add(queued).saturating_sub(batch_size))
}

impl<S, K, P, X> MerkleBlockSync<S, K, P, X>
where
    S: BlockStorage,
    K: KeyStorage,
    P: PeerConnection,
    X: TransactionExtractor,
{
    /// Request every stored block with a height between `start` and `end`
    /// (either order, both inclusive) in one getdata message.
    ///
    /// Blocks already outstanding are skipped. Returns how many blocks were
    /// requested; 0 when storage had none or the request could not be made,
    /// in which case nothing about the session changed.
    pub async fn schedule_batch(&mut self, start: BlockHeight, end: BlockHeight) -> u32 {
        match self.try_schedule_batch(start, end).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Failed to request merkle blocks {}..={}: {}", start, end, e);
                0
            }
        }
    }

    pub(super) async fn try_schedule_batch(
        &mut self,
        start: BlockHeight,
        end: BlockHeight,
    ) -> SyncResult<u32> {
        let blocks =
            self.block_storage.read().await.get_blocks_in_height_range(start, end).await?;

        let mut seen = HashSet::with_capacity(blocks.len());
        let batch: Vec<BlockInfo> = blocks
            .into_iter()
            .filter(|block| !self.outstanding.contains_key(block.hash()))
            .filter(|block| seen.insert(*block.hash()))
            .collect();

        if batch.is_empty() {
            tracing::trace!("No blocks to request in {}..={}", start, end);
            return Ok(0);
        }

        let mut getdata = GetDataBuilder::with_capacity(batch.len());
        for block in &batch {
            getdata.add_filtered_block(block.hash())?;
        }
        self.peer.queue_message(getdata.build())?;

        // A new batch retires the oldest index generation.
        if self.state.is_idle() {
            self.index.rotate();
            self.state = BatchState::awaiting(Instant::now());
        }

        let count = batch.len() as u32;
        self.outstanding.extend(batch.into_iter().map(|block| (*block.hash(), block)));
        self.progress.add_requested(count);

        tracing::debug!(
            "Requested {} merkle blocks {}..={} ({} outstanding)",
            count,
            start,
            end,
            self.outstanding.len()
        );
        Ok(count)
    }

    /// Schedule one phase. `None` means the cycle should stop here.
    async fn schedule_phase(
        &mut self,
        phase: &str,
        start: BlockHeight,
        end: BlockHeight,
    ) -> Option<u32> {
        match self.try_schedule_batch(start, end).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::error!(
                    "Failed to schedule {} merkle blocks {}..={}: {}",
                    phase,
                    start,
                    end,
                    e
                );
                None
            }
        }
    }

    /// Decide which blocks to request next and request them.
    ///
    /// Does nothing while a batch is outstanding or when there are no keys.
    /// Returns the number of blocks requested; 0 means every key is scanned
    /// from genesis to the tip.
    ///
    /// A storage failure in one phase ends the decision without trying the
    /// later phases, which would otherwise walk forward from genesis after a
    /// failed bootstrap. Phases already requested stay outstanding.
    pub async fn decide_next_batch(&mut self) -> u32 {
        if self.state.is_awaiting() {
            tracing::trace!(
                "Not scheduling, {} merkle blocks still outstanding",
                self.outstanding.len()
            );
            return 0;
        }
        if self.tracker.is_empty() {
            tracing::debug!("No keys to scan");
            return 0;
        }

        let min_checked = self.tracker.min_height_checked();
        let max_checked = self.tracker.max_height_checked();
        let tip = match self.block_storage.read().await.get_recent_block().await {
            Ok(block) => block.height(),
            Err(e) => {
                tracing::error!("Failed to get recent block, not scheduling: {}", e);
                return 0;
            }
        };

        let batch_size = self.config.batch_size;
        let mut queued = 0u32;

        if max_checked == 0 {
            let (start, end) = bootstrap_range(tip, batch_size);
            let Some(count) = self.schedule_phase("bootstrap", start, end).await else {
                return queued;
            };
            queued += count;
        }

        if queued < batch_size && tip > max_checked {
            let (start, end) = forward_range(max_checked, tip, batch_size, queued);
            let Some(count) = self.schedule_phase("forward", start, end).await else {
                return queued;
            };
            queued += count;
        }

        if queued < batch_size && min_checked > 1 {
            let (start, end) = backfill_range(min_checked, batch_size, queued);
            let Some(count) = self.schedule_phase("backfill", start, end).await else {
                return queued;
            };
            queued += count;
        }

        if queued > 0 {
            tracing::info!(
                "Queued {} merkle blocks (tip {}, scanned {}..={})",
                queued,
                tip,
                min_checked,
                max_checked
            );
        } else {
            tracing::info!("Merkle blocks all caught up at height {}", tip);
        }
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_reaches_one_batch_below_tip() {
        assert_eq!(bootstrap_range(500_000, 2000), (500_000, 498_000));
        assert_eq!(bootstrap_range(150, 2000), (150, 0));
    }

    #[test]
    fn test_forward_capped_by_tip_and_room() {
        assert_eq!(forward_range(1000, 1050, 2000, 0), (1001, 1050));
        assert_eq!(forward_range(1000, 10_000, 2000, 0), (1001, 3000));
        assert_eq!(forward_range(1000, 10_000, 2000, 1500), (1001, 1500));
    }

    #[test]
    fn test_backfill_clamps_at_genesis() {
        assert_eq!(backfill_range(5000, 2000, 0), (5000, 3000));
        assert_eq!(backfill_range(5000, 2000, 50), (5000, 3050));
        assert_eq!(backfill_range(400, 2000, 0), (400, 0));
    }
}
