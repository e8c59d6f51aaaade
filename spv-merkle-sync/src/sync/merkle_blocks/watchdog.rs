//! Timeouts for unanswered batches.
//!
//! A peer that never answers part of a batch would stall the sync forever,
//! since the next decision waits for the whole batch. The watchdog re-requests
//! whatever is still outstanding and eventually abandons the batch.

use std::time::Instant;

use super::manager::MerkleBlockSync;
use super::state::BatchState;
use crate::error::SyncResult;
use crate::merkle::TransactionExtractor;
use crate::network::{GetDataBuilder, PeerConnection};
use crate::storage::{BlockStorage, KeyStorage};

/// What a watchdog check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    /// Nothing timed out.
    None,
    /// The outstanding blocks were requested again.
    Resent {
        blocks: usize,
        attempt: u32,
    },
    /// Re-requesting failed. The attempt still counts.
    ResendFailed {
        attempt: u32,
    },
    /// Retries are exhausted and the outstanding blocks were dropped.
    Abandoned {
        blocks: usize,
    },
}

impl<S, K, P, X> MerkleBlockSync<S, K, P, X>
where
    S: BlockStorage,
    K: KeyStorage,
    P: PeerConnection,
    X: TransactionExtractor,
{
    /// Check the outstanding batch for a timeout.
    pub fn tick(&mut self) -> WatchdogAction {
        self.check_timeout_at(Instant::now())
    }

    /// Check the outstanding batch for a timeout as of `now`.
    ///
    /// An abandoned batch leaves key ranges unsaved and the session idle, so
    /// the next scheduling decision requests the missing heights again.
    pub fn check_timeout_at(&mut self, now: Instant) -> WatchdogAction {
        let BatchState::AwaitingBatch {
            requested_at,
            attempts,
        } = self.state
        else {
            return WatchdogAction::None;
        };

        if now.saturating_duration_since(requested_at) < self.config.request_timeout {
            return WatchdogAction::None;
        }

        if attempts >= self.config.max_request_retries {
            let blocks = self.outstanding.len();
            tracing::warn!(
                "Abandoning batch with {} unanswered merkle blocks after {} retries",
                blocks,
                attempts
            );
            self.outstanding.clear();
            self.state = BatchState::Idle;
            self.progress.add_abandoned();
            return WatchdogAction::Abandoned {
                blocks,
            };
        }

        let attempt = attempts + 1;
        self.state = BatchState::AwaitingBatch {
            requested_at: now,
            attempts: attempt,
        };

        match self.resend_outstanding() {
            Ok(blocks) => {
                tracing::warn!(
                    "Merkle block batch timed out, re-requested {} blocks (attempt {}/{})",
                    blocks,
                    attempt,
                    self.config.max_request_retries
                );
                self.progress.add_resent();
                WatchdogAction::Resent {
                    blocks,
                    attempt,
                }
            }
            Err(e) => {
                tracing::error!("Failed to re-request merkle blocks: {}", e);
                WatchdogAction::ResendFailed {
                    attempt,
                }
            }
        }
    }

    fn resend_outstanding(&self) -> SyncResult<usize> {
        let mut getdata = GetDataBuilder::with_capacity(self.outstanding.len());
        for hash in self.outstanding.keys() {
            getdata.add_filtered_block(hash)?;
        }
        let count = getdata.len();
        self.peer.queue_message(getdata.build())?;
        Ok(count)
    }
}
