//! Full sessions: a simulated peer answering getdata, keys persisted to disk,
//! and a second session resuming where the first stopped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bitcoin::p2p::message::NetworkMessage;
use spv_merkle_sync::network::{as_filtered_block, RequestSender};
use spv_merkle_sync::storage::{JsonKeyStorage, KeyStorage, MemoryStorage};
use spv_merkle_sync::test_utils::{merkle_block_with, test_block, test_chain, test_txid};
use spv_merkle_sync::{
    BlockHash, BlockHeight, MerkleBlockSync, MerkleProofExtractor, ScanKey, SyncConfig, SyncHandle,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Answers every filtered-block request with a merkle block matching the
/// first transaction of each block.
fn spawn_peer(
    chain_tip: BlockHeight,
    mut requests: mpsc::UnboundedReceiver<NetworkMessage>,
    responses: mpsc::UnboundedSender<NetworkMessage>,
) -> JoinHandle<()> {
    let heights: HashMap<BlockHash, BlockHeight> =
        test_chain(1..=chain_tip).into_iter().map(|b| (*b.hash(), b.height())).collect();

    tokio::spawn(async move {
        while let Some(message) = requests.recv().await {
            let NetworkMessage::GetData(inventory) = message else {
                continue;
            };
            for hash in inventory.iter().filter_map(as_filtered_block) {
                let Some(&height) = heights.get(&hash) else {
                    continue;
                };
                let first = test_txid(height, 0);
                let block = merkle_block_with(height, |txid| *txid == first);
                if responses.send(NetworkMessage::MerkleBlock(block)).is_err() {
                    return;
                }
            }
        }
    })
}

async fn wait_for_range(handle: &SyncHandle, min: BlockHeight, max: BlockHeight) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        let keys = handle.keys().await.unwrap();
        if keys.iter().all(|k| k.min_check() == min && k.max_check() == max) {
            return;
        }
        assert!(tokio::time::Instant::now() < deadline, "sync stalled at {:?}", keys);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn run_session(
    dir: &TempDir,
    chain_tip: BlockHeight,
    expect_min: BlockHeight,
) -> (SyncHandle, CancellationToken, JoinHandle<()>) {
    let mut headers = MemoryStorage::new();
    headers.store_blocks(test_chain(1..=chain_tip));
    let headers = Arc::new(RwLock::new(headers));
    let keys = Arc::new(RwLock::new(JsonKeyStorage::open(dir.path())));

    let (peer, requests) = RequestSender::channel();
    let (responses, inbound) = mpsc::unbounded_channel();
    spawn_peer(chain_tip, requests, responses);

    let config = SyncConfig::new().with_batch_size(25).with_storage_path(dir.path());
    let mut sync = MerkleBlockSync::new(config, headers, keys, peer, MerkleProofExtractor).unwrap();
    sync.initialize().await.unwrap();

    let (handle, commands) = SyncHandle::channel();
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let session = tokio::spawn(async move {
        sync.run(inbound, commands, token).await;
    });

    wait_for_range(&handle, expect_min, chain_tip).await;
    (handle, shutdown, session)
}

#[tokio::test]
async fn test_session_scans_to_genesis_and_persists() {
    let dir = TempDir::new().unwrap();
    let mut seed = JsonKeyStorage::open(dir.path());
    seed.persist_keys(&[ScanKey::new("receive"), ScanKey::new("change")]).await.unwrap();

    let (handle, shutdown, session) = run_session(&dir, 120, 1).await;

    // The last batch that reached height 1 is still indexed.
    assert_eq!(handle.find_block(test_txid(1, 0)).await.unwrap(), Some(test_block(1)));
    assert_eq!(handle.find_block(test_txid(1, 1)).await.unwrap(), None);
    let progress = handle.progress().await.unwrap();
    assert_eq!(progress.received(), progress.requested());
    assert_eq!(progress.unsolicited(), 0);

    shutdown.cancel();
    session.await.unwrap();

    let stored = JsonKeyStorage::open(dir.path()).load_keys().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|k| k.min_check() == 1 && k.max_check() == 120));
}

#[tokio::test]
async fn test_second_session_resumes_with_new_blocks() {
    let dir = TempDir::new().unwrap();
    let mut seed = JsonKeyStorage::open(dir.path());
    seed.persist_keys(&[ScanKey::from_checks("receive", 1, 100).unwrap()]).await.unwrap();

    // Ten blocks arrived since the last session.
    let (handle, shutdown, session) = run_session(&dir, 110, 1).await;

    let progress = handle.progress().await.unwrap();
    assert_eq!(progress.requested(), 10);
    assert_eq!(progress.batches_completed(), 1);

    shutdown.cancel();
    session.await.unwrap();

    let stored = JsonKeyStorage::open(dir.path()).load_keys().await.unwrap();
    assert_eq!((stored[0].min_check(), stored[0].max_check()), (1, 110));
}
