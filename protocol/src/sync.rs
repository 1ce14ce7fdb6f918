//! # Sync loop
//!
//! The peer reconciliation cycle run every [`crate::config::SYNC_TICK_SECS`]
//! seconds by the node orchestrator: poll each known peer's status, join
//! peers we haven't shaken hands with yet, pull any blocks we're missing,
//! learn about peers-of-peers, and absorb their pending transactions.
//!
//! `spec.md` §4.7 numbers this as five steps; each has its own function
//! here so a single bad peer's failure in one step cannot abort the
//! others.

use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::block::Block;
use crate::hash::Hash;
use crate::mempool::Mempool;
use crate::peer::{PeerNode, PeerRegistry};
use crate::state::{State, StateError};
use crate::transaction::SignedTransaction;
use crate::wire::{AddPeerRes, StatusRes, SyncRes};

/// Runs one full reconciliation cycle against every currently known
/// peer. Errors talking to an individual peer are logged and that peer
/// is dropped from the registry; they never abort the cycle for the
/// remaining peers.
///
/// Every peer block this cycle successfully applies is published on
/// `new_synced_blocks` — this is what lets the mining supervisor notice
/// a peer has subsumed its in-progress candidate and cancel it.
pub async fn sync_once(
    client: &Client,
    self_ip: &str,
    self_port: u16,
    self_account: crate::account::Account,
    peers: &PeerRegistry,
    state: &parking_lot::Mutex<State>,
    mempool: &Mempool,
    new_synced_blocks: &mpsc::Sender<Block>,
) {
    for peer in peers.snapshot() {
        let status = match fetch_status(client, &peer).await {
            Ok(status) => status,
            Err(err) => {
                warn!(peer = %peer.address(), error = %err, "peer status fetch failed, dropping peer");
                peers.delete(&peer.address());
                continue;
            }
        };

        join_known_peer(client, self_ip, self_port, self_account, peers, &peer).await;
        sync_blocks(client, peers, state, mempool, new_synced_blocks, &peer, &status).await;
        sync_known_peers(peers, &status);
        sync_pending_trxs(mempool, &status);
    }
}

async fn fetch_status(client: &Client, peer: &PeerNode) -> Result<StatusRes, reqwest::Error> {
    client
        .get(format!("http://{}/node/status", peer.address()))
        .send()
        .await?
        .error_for_status()?
        .json::<StatusRes>()
        .await
}

/// Step 2: if we haven't shaken hands with `peer` yet, announce ourselves
/// to it. Failure here is logged and otherwise ignored — the next cycle
/// tries again.
async fn join_known_peer(
    client: &Client,
    self_ip: &str,
    self_port: u16,
    self_account: crate::account::Account,
    peers: &PeerRegistry,
    peer: &PeerNode,
) {
    if peer.connected {
        return;
    }

    let url = format!(
        "http://{}/node/peer?ip={}&port={}&miner={}",
        peer.address(),
        self_ip,
        self_port,
        self_account
    );
    match client.get(url).send().await {
        Ok(res) => match res.json::<AddPeerRes>().await {
            Ok(body) if body.success => peers.mark_connected(&peer.address(), true),
            Ok(body) => warn!(peer = %peer.address(), error = ?body.error, "peer join rejected"),
            Err(err) => warn!(peer = %peer.address(), error = %err, "peer join response unreadable"),
        },
        Err(err) => warn!(peer = %peer.address(), error = %err, "peer join request failed"),
    }
}

/// Step 3: pulls and applies any blocks `peer` has that we don't. Each
/// applied block is handed to `new_synced_blocks` so the mining
/// supervisor can preempt an in-progress attempt over the stale tip.
async fn sync_blocks(
    client: &Client,
    peers: &PeerRegistry,
    state: &parking_lot::Mutex<State>,
    mempool: &Mempool,
    new_synced_blocks: &mpsc::Sender<Block>,
    peer: &PeerNode,
    status: &StatusRes,
) {
    if status.block_hash.is_empty() {
        return;
    }

    let (local_height, local_hash) = {
        let state = state.lock();
        let height = state.latest_block().map(|b| b.height()).unwrap_or(0);
        (height, state.latest_block_hash())
    };

    if status.block_height < local_height {
        return;
    }

    let both_at_genesis = status.block_height == 0 && local_height == 0;
    if both_at_genesis && status.block_hash == local_hash {
        return;
    }

    let blocks = match fetch_blocks_from(client, peer, local_hash).await {
        Ok(blocks) => blocks,
        Err(err) => {
            warn!(peer = %peer.address(), error = %err, "block fetch failed, dropping peer");
            peers.delete(&peer.address());
            return;
        }
    };

    for block in blocks {
        let result = {
            let mut state = state.lock();
            state.add_block(block.clone())
        };
        match result {
            Ok(_) => {
                mempool.archive_block(&block);
                debug!(height = block.height(), "applied block from peer");
                if new_synced_blocks.send(block).await.is_err() {
                    warn!("new_synced_blocks channel closed, mining supervisor may be stopped");
                }
            }
            Err(StateError::BadHeight { .. }) | Err(StateError::BadParent { .. }) => {
                // Peer is ahead of what we can apply contiguously this
                // cycle; the next cycle picks up from our new tip.
                break;
            }
            Err(err) => {
                warn!(peer = %peer.address(), error = %err, "rejected block from peer");
                break;
            }
        }
    }
}

async fn fetch_blocks_from(
    client: &Client,
    peer: &PeerNode,
    from_block: Hash,
) -> Result<Vec<Block>, reqwest::Error> {
    let res: SyncRes = client
        .get(format!("http://{}/node/sync", peer.address()))
        .query(&[("fromBlock", from_block.to_hex())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(res.blocks)
}

/// Step 4: learn about peers the peer knows that we don't yet.
fn sync_known_peers(peers: &PeerRegistry, status: &StatusRes) {
    for candidate in &status.peers_known {
        if !peers.is_known(&candidate.address()) {
            let mut unconnected = candidate.clone();
            unconnected.connected = false;
            peers.add(unconnected);
        }
    }
}

/// Step 5: absorb the peer's pending transactions into our own mempool.
fn sync_pending_trxs(mempool: &Mempool, status: &StatusRes) {
    for tx in &status.pending_trxs {
        add_pending_trx(mempool, tx.clone());
    }
}

/// Shared entry point for accepting a transaction into the mempool,
/// whether it arrived via HTTP `POST /trx/add` or a peer's status
/// response. Authenticity is checked once here so neither caller has to
/// repeat it; a forged transaction is silently dropped rather than
/// propagated further.
pub fn add_pending_trx(mempool: &Mempool, tx: SignedTransaction) -> bool {
    if !tx.is_authentic() {
        return false;
    }
    mempool.add_pending(tx)
}
