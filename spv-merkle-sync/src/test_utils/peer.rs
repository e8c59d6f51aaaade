use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bitcoin::p2p::message::NetworkMessage;
use bitcoin::BlockHash;

use crate::error::{NetworkError, NetworkResult};
use crate::network::{as_filtered_block, PeerConnection};

/// Peer that records every message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct MockPeer {
    sent: Arc<Mutex<Vec<NetworkMessage>>>,
    failing: Arc<AtomicBool>,
}

impl MockPeer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with `NotConnected`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_messages(&self) -> Vec<NetworkMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Filtered-block hashes of every getdata sent so far, in order.
    pub fn requested_blocks(&self) -> Vec<BlockHash> {
        self.sent_messages().iter().flat_map(filtered_blocks).collect()
    }

    /// Filtered-block hashes of the most recent getdata.
    pub fn last_request(&self) -> Vec<BlockHash> {
        self.sent.lock().unwrap().last().map(filtered_blocks).unwrap_or_default()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

fn filtered_blocks(message: &NetworkMessage) -> Vec<BlockHash> {
    match message {
        NetworkMessage::GetData(inventory) => {
            inventory.iter().filter_map(as_filtered_block).collect()
        }
        _ => Vec::new(),
    }
}

impl PeerConnection for MockPeer {
    fn queue_message(&self, message: NetworkMessage) -> NetworkResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NetworkError::NotConnected);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}
