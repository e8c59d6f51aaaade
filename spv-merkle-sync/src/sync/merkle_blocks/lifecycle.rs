//! Session lifecycle: start, the event loop and shutdown.

use bitcoin::p2p::message::NetworkMessage;
use bitcoin::Txid;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::manager::MerkleBlockSync;
use super::progress::MerkleBlocksProgress;
use super::watchdog::WatchdogAction;
use crate::error::{SyncError, SyncResult};
use crate::merkle::TransactionExtractor;
use crate::network::PeerConnection;
use crate::storage::{BlockStorage, KeyStorage};
use crate::sync::ScanKey;
use crate::types::BlockInfo;

/// Requests a running session answers between peer messages.
#[derive(Debug)]
pub enum SyncCommand {
    /// Run a scheduling decision if no batch is outstanding, e.g. after new
    /// headers were stored.
    Resume,
    FindBlock {
        txid: Txid,
        reply: oneshot::Sender<Option<BlockInfo>>,
    },
    Progress {
        reply: oneshot::Sender<MerkleBlocksProgress>,
    },
    Keys {
        reply: oneshot::Sender<Vec<ScanKey>>,
    },
}

/// Cloneable handle for talking to a session started with
/// [`MerkleBlockSync::run`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
}

impl SyncHandle {
    pub fn new(commands: mpsc::UnboundedSender<SyncCommand>) -> Self {
        Self {
            commands,
        }
    }

    /// Create a handle together with the receiver to pass to `run`.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn resume(&self) -> SyncResult<()> {
        self.send(SyncCommand::Resume)
    }

    pub async fn find_block(&self, txid: Txid) -> SyncResult<Option<BlockInfo>> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncCommand::FindBlock {
            txid,
            reply,
        })?;
        rx.await.map_err(|_| session_closed())
    }

    pub async fn progress(&self) -> SyncResult<MerkleBlocksProgress> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncCommand::Progress {
            reply,
        })?;
        rx.await.map_err(|_| session_closed())
    }

    pub async fn keys(&self) -> SyncResult<Vec<ScanKey>> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncCommand::Keys {
            reply,
        })?;
        rx.await.map_err(|_| session_closed())
    }

    fn send(&self, command: SyncCommand) -> SyncResult<()> {
        self.commands.send(command).map_err(|_| session_closed())
    }
}

fn session_closed() -> SyncError {
    SyncError::InvalidState("sync session is not running".to_string())
}

impl<S, K, P, X> MerkleBlockSync<S, K, P, X>
where
    S: BlockStorage,
    K: KeyStorage,
    P: PeerConnection,
    X: TransactionExtractor,
{
    /// Load keys and schedule the first batch. Returns the number of blocks
    /// requested.
    pub async fn start_sync(&mut self) -> SyncResult<u32> {
        self.initialize().await?;
        Ok(self.decide_next_batch().await)
    }

    /// Drive the session until `shutdown` fires or the peer stream closes.
    ///
    /// Merkle blocks from `inbound` are handled in arrival order, other
    /// messages are ignored. The watchdog runs every `tick_interval`; an
    /// abandoned batch is followed by a new scheduling decision. On exit the
    /// outstanding batch is discarded and the key ranges are left as last
    /// saved.
    pub async fn run(
        &mut self,
        mut inbound: mpsc::UnboundedReceiver<NetworkMessage>,
        mut commands: mpsc::UnboundedReceiver<SyncCommand>,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.decide_next_batch().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::info!("Merkle block sync shutting down");
                    break;
                }
                message = inbound.recv() => match message {
                    Some(NetworkMessage::MerkleBlock(merkle_block)) => {
                        self.handle_merkle_block(&merkle_block).await;
                    }
                    Some(other) => {
                        tracing::trace!("Ignoring {} message", other.cmd());
                    }
                    None => {
                        tracing::info!("Peer message stream closed, stopping merkle block sync");
                        break;
                    }
                },
                Some(command) = commands.recv() => {
                    self.handle_command(command).await;
                }
                _ = ticker.tick() => {
                    if let WatchdogAction::Abandoned { .. } = self.tick() {
                        self.decide_next_batch().await;
                    }
                }
            }
        }

        self.discard_batch();
    }

    async fn handle_command(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::Resume => {
                self.decide_next_batch().await;
            }
            SyncCommand::FindBlock {
                txid,
                reply,
            } => {
                let _ = reply.send(self.find_block(&txid));
            }
            SyncCommand::Progress {
                reply,
            } => {
                let _ = reply.send(self.progress.clone());
            }
            SyncCommand::Keys {
                reply,
            } => {
                let _ = reply.send(self.tracker.keys().to_vec());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SyncConfig;
    use crate::test_utils::{
        merkle_block_matching_all, test_block, test_chain, test_sync, test_txid, MockExtractor,
        MockStorage,
    };

    #[tokio::test]
    async fn test_commands_answered_while_running() {
        let storage = MockStorage::new(test_chain(1..=20), vec![ScanKey::new("a")]);
        let config = SyncConfig::new().with_batch_size(5);
        let (mut sync, storage, peer) = test_sync(config, storage, MockExtractor::new()).await;

        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (handle, commands) = SyncHandle::channel();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let session = tokio::spawn(async move {
            sync.run(inbound, commands, token).await;
            sync
        });

        inbound_tx.send(NetworkMessage::MerkleBlock(merkle_block_matching_all(20))).unwrap();
        inbound_tx.send(NetworkMessage::Verack).unwrap();

        assert_eq!(handle.find_block(test_txid(20, 1)).await.unwrap(), Some(test_block(20)));
        let progress = handle.progress().await.unwrap();
        assert_eq!(progress.requested(), 6);
        assert_eq!(progress.received(), 1);
        assert_eq!(handle.keys().await.unwrap()[0].max_check(), 20);

        shutdown.cancel();
        let sync = tokio::time::timeout(Duration::from_secs(5), session).await.unwrap().unwrap();

        // Cancelled mid-batch: nothing outstanding, nothing indexed, nothing saved.
        assert!(sync.state().is_idle());
        assert_eq!(sync.outstanding_count(), 0);
        assert!(sync.batch_index().is_empty());
        assert_eq!(storage.read().await.persists(), 0);
        assert_eq!(peer.sent_count(), 1);
        assert!(handle.resume().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_when_peer_stream_closes() {
        let storage = MockStorage::new(test_chain(1..=3), vec![ScanKey::new("a")]);
        let (mut sync, _storage, _peer) =
            test_sync(SyncConfig::new(), storage, MockExtractor::new()).await;

        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (_handle, commands) = SyncHandle::channel();
        drop(inbound_tx);

        tokio::time::timeout(
            Duration::from_secs(5),
            sync.run(inbound, commands, CancellationToken::new()),
        )
        .await
        .unwrap();
        assert_eq!(sync.outstanding_count(), 0);
    }

    #[tokio::test]
    async fn test_start_sync_loads_keys_and_schedules() {
        let storage = MockStorage::new(test_chain(1..=3), vec![ScanKey::new("a")]);
        let (mut sync, _storage, peer) =
            test_sync(SyncConfig::new(), storage, MockExtractor::new()).await;

        assert_eq!(sync.start_sync().await.unwrap(), 3);
        assert_eq!(peer.requested_blocks().len(), 3);
        assert!(matches!(sync.start_sync().await, Err(SyncError::SyncInProgress)));
    }
}
