mod handler;
mod lifecycle;
mod manager;
mod progress;
mod queries;
mod scheduler;
mod state;
mod watchdog;

pub use handler::MerkleBlockOutcome;
pub use lifecycle::{SyncCommand, SyncHandle};
pub use manager::MerkleBlockSync;
pub use progress::MerkleBlocksProgress;
pub use state::BatchState;
pub use watchdog::WatchdogAction;
