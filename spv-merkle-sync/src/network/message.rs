//! `getdata` construction for BIP37 filtered blocks.

use bitcoin::hashes::Hash;
use bitcoin::p2p::message::NetworkMessage;
use bitcoin::p2p::message_blockdata::Inventory;
use bitcoin::BlockHash;

use crate::error::{NetworkError, NetworkResult};

/// Inventory type of a filtered (merkle) block, `MSG_FILTERED_BLOCK`.
pub const INV_TYPE_FILTERED_BLOCK: u32 = 3;

/// Maximum inventory entries allowed in one `getdata`.
pub const MAX_INV_PER_MSG: usize = 50_000;

/// Inventory entry asking the peer for a merkle block instead of the full block.
pub fn filtered_block_inventory(hash: &BlockHash) -> Inventory {
    Inventory::Unknown {
        inv_type: INV_TYPE_FILTERED_BLOCK,
        hash: hash.to_byte_array(),
    }
}

/// Block hash of a filtered-block inventory entry, `None` for other kinds.
pub fn as_filtered_block(inventory: &Inventory) -> Option<BlockHash> {
    match inventory {
        Inventory::Unknown {
            inv_type: INV_TYPE_FILTERED_BLOCK,
            hash,
        } => Some(BlockHash::from_byte_array(*hash)),
        _ => None,
    }
}

/// Accumulates filtered-block inventory for a single `getdata`.
#[derive(Debug, Default, Clone)]
pub struct GetDataBuilder {
    inventory: Vec<Inventory>,
}

impl GetDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inventory: Vec::with_capacity(capacity.min(MAX_INV_PER_MSG)),
        }
    }

    /// Add a filtered-block entry. Fails once the message is full.
    pub fn add_filtered_block(&mut self, hash: &BlockHash) -> NetworkResult<()> {
        if self.inventory.len() >= MAX_INV_PER_MSG {
            return Err(NetworkError::MessageConstruction(format!(
                "too many inventory entries for getdata (max {})",
                MAX_INV_PER_MSG
            )));
        }
        self.inventory.push(filtered_block_inventory(hash));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inventory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty()
    }

    pub fn build(self) -> NetworkMessage {
        NetworkMessage::GetData(self.inventory)
    }
}
