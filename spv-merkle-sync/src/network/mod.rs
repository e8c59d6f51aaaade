//! Peer-facing side of merkle-block sync.
//!
//! The transport itself lives outside this crate. Sync only needs a way to
//! queue outbound messages; inbound messages are fed to the sync session by
//! whoever owns the connection.

pub mod message;

use bitcoin::p2p::message::NetworkMessage;
use tokio::sync::mpsc;

use crate::error::{NetworkError, NetworkResult};

pub use message::{as_filtered_block, filtered_block_inventory, GetDataBuilder};

/// Outbound half of a peer connection.
pub trait PeerConnection: Send + Sync {
    /// Queue a message for the peer. Delivery is fire-and-forget: `Ok` only
    /// means the message was handed to the transport.
    fn queue_message(&self, message: NetworkMessage) -> NetworkResult<()>;
}

/// Channel-backed [`PeerConnection`] handing messages to a transport task.
#[derive(Debug, Clone)]
pub struct RequestSender {
    tx: mpsc::UnboundedSender<NetworkMessage>,
}

impl RequestSender {
    pub fn new(tx: mpsc::UnboundedSender<NetworkMessage>) -> Self {
        Self {
            tx,
        }
    }

    /// Create a sender together with the receiver the transport drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NetworkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl PeerConnection for RequestSender {
    fn queue_message(&self, message: NetworkMessage) -> NetworkResult<()> {
        self.tx.send(message).map_err(|_| NetworkError::NotConnected)
    }
}
