//! # Miner
//!
//! A proof-of-work nonce search. `mine` is a non-suspending busy loop —
//! it is meant to run on a blocking thread (`tokio::task::spawn_blocking`
//! in the node orchestrator), checking the cancellation token between
//! hash attempts rather than awaiting anything itself.

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::account::Account;
use crate::block::{Block, BlockHeader};
use crate::hash::Hash;
use crate::transaction::SignedTransaction;

/// A candidate block awaiting a winning nonce. `time` is fixed at
/// construction — it does not change as nonces are tried.
#[derive(Debug, Clone)]
pub struct PendingBlock {
    pub parent: Hash,
    pub height: u64,
    pub time: u64,
    pub miner: Account,
    pub trxs: Vec<SignedTransaction>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MinerError {
    #[error("refusing to mine an empty block")]
    EmptyBlock,
    #[error("mining attempt cancelled")]
    Cancelled,
}

/// Attempts every 1,000,000 nonces, a progress line is logged at this
/// interval (and once at the very first attempt) — permitted, not
/// required, by `spec.md` §4.5.
const PROGRESS_INTERVAL: u64 = 1_000_000;

/// Repeatedly picks a uniformly random 32-bit nonce, assembles the
/// candidate block, and checks the difficulty predicate, until either a
/// valid nonce is found or `cancel` fires.
///
/// Nonces are random rather than sequential: two miners racing over
/// identical mempools do not collide deterministically.
pub fn mine(cancel: &CancellationToken, pending: PendingBlock) -> Result<Block, MinerError> {
    if pending.trxs.is_empty() {
        return Err(MinerError::EmptyBlock);
    }

    let mut trxs = pending.trxs;
    trxs.sort_by_key(|tx| tx.time());

    let mut rng = rand::thread_rng();
    let mut attempts: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(MinerError::Cancelled);
        }

        attempts += 1;
        if attempts == 1 || attempts % PROGRESS_INTERVAL == 0 {
            info!(height = pending.height, attempts, "mining in progress");
        }

        let nonce: u32 = rng.gen();
        let header = BlockHeader {
            parent: pending.parent,
            height: pending.height,
            nonce,
            time: pending.time,
            miner: pending.miner,
        };
        let block = Block::new(header, trxs.clone());
        if block.satisfies_difficulty() {
            return Ok(block);
        }
    }
}
