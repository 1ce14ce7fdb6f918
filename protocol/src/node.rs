//! # Node orchestrator
//!
//! Owns the state engine, peer registry, and mempool, and drives the two
//! background activities described in `spec.md` §4.7/§4.8: the sync loop
//! (peer reconciliation, tick [`crate::config::SYNC_TICK_SECS`]) and the
//! mining supervisor (tick [`crate::config::MINE_TICK_SECS`]). The HTTP
//! surface itself is wired up by the binary crate; this module exposes
//! the plain methods its handlers call.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::account::Account;
use crate::block::Block;
use crate::config::{
    MINE_TICK_SECS, PENDING_TRX_CHANNEL_CAPACITY, SYNCED_BLOCK_CHANNEL_CAPACITY, SYNC_TICK_SECS,
};
use crate::hash::Hash;
use crate::mempool::Mempool;
use crate::miner::{self, MinerError, PendingBlock};
use crate::peer::{PeerNode, PeerRegistry};
use crate::state::{State, StateError};
use crate::sync::{self as sync_loop};
use crate::transaction::SignedTransaction;
use crate::wire::StatusRes;

/// The node's owned, mutable runtime. Wrapped in `Arc` so the HTTP
/// handlers, the sync task, and the mining supervisor can all hold a
/// handle to the same instance.
pub struct Node {
    pub info: PeerNode,
    state: Mutex<State>,
    peers: PeerRegistry,
    mempool: Mempool,
    http_client: Client,
    is_mining: Mutex<bool>,
    new_pending_trxs_tx: mpsc::Sender<SignedTransaction>,
    new_pending_trxs_rx: Mutex<Option<mpsc::Receiver<SignedTransaction>>>,
    new_synced_blocks_tx: mpsc::Sender<Block>,
    new_synced_blocks_rx: Mutex<Option<mpsc::Receiver<Block>>>,
}

impl Node {
    pub fn new(info: PeerNode, state: State, peers: PeerRegistry, mempool: Mempool) -> Arc<Self> {
        let (pending_tx, pending_rx) = mpsc::channel(PENDING_TRX_CHANNEL_CAPACITY);
        let (synced_tx, synced_rx) = mpsc::channel(SYNCED_BLOCK_CHANNEL_CAPACITY);
        Arc::new(Node {
            info,
            state: Mutex::new(state),
            peers,
            mempool,
            http_client: Client::new(),
            is_mining: Mutex::new(false),
            new_pending_trxs_tx: pending_tx,
            new_pending_trxs_rx: Mutex::new(Some(pending_rx)),
            new_synced_blocks_tx: synced_tx,
            new_synced_blocks_rx: Mutex::new(Some(synced_rx)),
        })
    }

    // --- HTTP-facing read paths -------------------------------------------------

    pub fn balances_snapshot(&self) -> (Hash, std::collections::HashMap<Account, u64>) {
        let state = self.state.lock();
        (state.latest_block_hash(), state.balances())
    }

    pub fn status(&self) -> StatusRes {
        let state = self.state.lock();
        StatusRes {
            block_hash: state.latest_block_hash(),
            block_height: state.latest_block().map(|b| b.height()).unwrap_or(0),
            peers_known: self.peers.snapshot(),
            pending_trxs: self.mempool.pending_snapshot(),
        }
    }

    pub fn blocks_from(&self, from: Hash) -> Result<Vec<Block>, StateError> {
        self.state.lock().blocks_from(from)
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn add_known_peer(&self, peer: PeerNode) {
        self.peers.add(peer);
    }

    // --- Mempool ingestion -------------------------------------------------

    /// `addPendingTrx`: inserts `tx` if it is authentic and not already
    /// known (pending or archived), and notifies the mining supervisor.
    /// A duplicate or forged transaction is a silent no-op — this is the
    /// shared entry point for both `POST /trx/add` and transactions
    /// absorbed from a peer's status response.
    pub fn add_pending_trx(&self, tx: SignedTransaction) -> bool {
        if !sync_loop::add_pending_trx(&self.mempool, tx.clone()) {
            return false;
        }
        if self.new_pending_trxs_tx.try_send(tx).is_err() {
            warn!("pending transaction channel full or closed, mining supervisor notified late");
        }
        true
    }

    // --- Background tasks ---------------------------------------------------

    /// Spawns the sync task and the mining supervisor, and returns their
    /// join handles. Both observe `cancel` for shutdown; callers `select!`
    /// this against the HTTP server's own shutdown future.
    pub fn run(self: &Arc<Self>, cancel: CancellationToken) -> (JoinHandle<()>, JoinHandle<()>) {
        let sync_handle = tokio::spawn(self.clone().run_sync_task(cancel.clone()));
        let mining_handle = tokio::spawn(self.clone().run_mining_supervisor(cancel));
        (sync_handle, mining_handle)
    }

    async fn run_sync_task(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval(Duration::from_secs(SYNC_TICK_SECS));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("sync task stopping");
                    return;
                }
                _ = ticker.tick() => {
                    sync_loop::sync_once(
                        &self.http_client,
                        &self.info.ip,
                        self.info.port,
                        self.info.account,
                        &self.peers,
                        &self.state,
                        &self.mempool,
                        &self.new_synced_blocks_tx,
                    )
                    .await;
                }
            }
        }
    }

    /// Implements the Idle/Mining state machine from `spec.md` §4.8.
    async fn run_mining_supervisor(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval(Duration::from_secs(MINE_TICK_SECS));
        let mut pending_rx = self
            .new_pending_trxs_rx
            .lock()
            .take()
            .expect("mining supervisor started exactly once");
        let mut synced_rx = self
            .new_synced_blocks_rx
            .lock()
            .take()
            .expect("mining supervisor started exactly once");

        let mut mining_task: Option<(JoinHandle<Result<Block, MinerError>>, CancellationToken)> =
            None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Some((handle, child)) = mining_task.take() {
                        child.cancel();
                        let _ = handle.await;
                    }
                    info!("mining supervisor stopping");
                    return;
                }
                _ = ticker.tick(), if mining_task.is_none() => {
                    if self.mempool.is_pending_empty() {
                        continue;
                    }
                    *self.is_mining.lock() = true;
                    let child = cancel.child_token();
                    let miner_token = child.clone();
                    let pending = self.build_pending_block();
                    let handle = tokio::task::spawn_blocking(move || miner::mine(&miner_token, pending));
                    mining_task = Some((handle, child));
                }
                Some(tx) = pending_rx.recv() => {
                    let _ = tx;
                }
                Some(block) = synced_rx.recv() => {
                    self.mempool.archive_block(&block);
                    if let Some((_, child)) = &mining_task {
                        child.cancel();
                    }
                }
                result = async {
                    match &mut mining_task {
                        Some((handle, _)) => handle.await,
                        None => std::future::pending().await,
                    }
                }, if mining_task.is_some() => {
                    mining_task = None;
                    *self.is_mining.lock() = false;
                    match result {
                        Ok(Ok(block)) => {
                            let mut state = self.state.lock();
                            match state.add_block(block.clone()) {
                                Ok(_) => {
                                    drop(state);
                                    self.mempool.archive_block(&block);
                                }
                                Err(err) => warn!(error = %err, "mined block rejected by own state engine"),
                            }
                        }
                        Ok(Err(MinerError::Cancelled)) => {}
                        Ok(Err(err)) => warn!(error = %err, "mining attempt failed"),
                        Err(join_err) => warn!(error = %join_err, "mining task panicked"),
                    }
                }
            }
        }
    }

    fn build_pending_block(&self) -> PendingBlock {
        let state = self.state.lock();
        let parent = state.latest_block_hash();
        let height = state.next_block_height();
        drop(state);
        PendingBlock {
            parent,
            height,
            time: now_secs(),
            miner: self.info.account,
            trxs: self.mempool.pending_snapshot(),
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Keypair;
    use crate::fs::InMemoryFs;
    use crate::transaction::UnsignedTransaction;
    use std::path::PathBuf;

    fn sample_node() -> Arc<Node> {
        let keypair = Keypair::generate();
        let fs = Arc::new(InMemoryFs::new());
        let state = State::open(fs, PathBuf::from("/data")).unwrap();
        let info = PeerNode::new("127.0.0.1", 9000, keypair.account(), false);
        let peers = PeerRegistry::new("127.0.0.1", 9000, None);
        Node::new(info, state, peers, Mempool::new())
    }

    #[test]
    fn status_reflects_empty_chain() {
        let node = sample_node();
        let status = node.status();
        assert!(status.block_hash.is_empty());
        assert_eq!(status.block_height, 0);
        assert!(status.pending_trxs.is_empty());
    }

    #[test]
    fn add_pending_trx_rejects_duplicate() {
        let node = sample_node();
        let keypair = Keypair::generate();
        let to = Account::from_bytes([0x21; 20]);
        let tx = UnsignedTransaction::new(keypair.account(), to, 1, "").sign(&keypair);

        assert!(node.add_pending_trx(tx.clone()));
        assert!(!node.add_pending_trx(tx));
        assert_eq!(node.status().pending_trxs.len(), 1);
    }

    #[test]
    fn build_pending_block_targets_current_tip() {
        let node = sample_node();
        let pending = node.build_pending_block();
        assert!(pending.parent.is_empty());
        assert_eq!(pending.height, 0);
    }
}
