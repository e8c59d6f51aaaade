use std::time::Instant;

/// Whether a batch of merkle blocks is in flight.
///
/// `Idle` exactly when the outstanding request set is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    AwaitingBatch {
        /// When the batch was last (re-)requested.
        requested_at: Instant,
        /// Re-requests sent so far for this batch.
        attempts: u32,
    },
}

impl BatchState {
    pub(super) fn awaiting(requested_at: Instant) -> Self {
        BatchState::AwaitingBatch {
            requested_at,
            attempts: 0,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self, BatchState::AwaitingBatch { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, BatchState::Idle)
    }
}
