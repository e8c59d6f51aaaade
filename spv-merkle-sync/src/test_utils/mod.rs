//! Fixtures and mocks for merkle-block sync tests.

mod chain;
mod extractor;
mod peer;
mod storage;

use std::sync::Arc;

use tokio::sync::RwLock;

pub use chain::{
    block_txids, merkle_block_at, merkle_block_matching_all, merkle_block_with, test_block,
    test_chain, test_header, test_txid, TXS_PER_BLOCK,
};
pub use extractor::MockExtractor;
pub use peer::MockPeer;
pub use storage::MockStorage;

use crate::config::SyncConfig;
use crate::sync::MerkleBlockSync;

pub type TestSync = MerkleBlockSync<MockStorage, MockStorage, MockPeer, MockExtractor>;

/// A sync manager over `storage`, which backs both blocks and keys.
///
/// Keys are loaded from `storage`. Returns the shared storage and the peer
/// for inspection.
pub async fn test_sync(
    config: SyncConfig,
    storage: MockStorage,
    extractor: MockExtractor,
) -> (TestSync, Arc<RwLock<MockStorage>>, MockPeer) {
    let storage = Arc::new(RwLock::new(storage));
    let peer = MockPeer::new();
    let mut sync =
        MerkleBlockSync::new(config, storage.clone(), storage.clone(), peer.clone(), extractor)
            .unwrap();
    sync.initialize().await.unwrap();
    (sync, storage, peer)
}
