use bitcoin::Txid;

use super::manager::MerkleBlockSync;
use crate::merkle::TransactionExtractor;
use crate::network::PeerConnection;
use crate::storage::{BlockStorage, KeyStorage};
use crate::types::BlockInfo;

impl<S, K, P, X> MerkleBlockSync<S, K, P, X>
where
    S: BlockStorage,
    K: KeyStorage,
    P: PeerConnection,
    X: TransactionExtractor,
{
    /// Block that proved `txid`, if it arrived in the current or the
    /// previous batch.
    pub fn find_block(&self, txid: &Txid) -> Option<BlockInfo> {
        self.index.get(txid).copied()
    }
}
