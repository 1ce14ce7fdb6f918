//! # Mempool
//!
//! Two maps, keyed by the lowercase hex of the unsigned-transaction
//! hash: `pending` (awaiting inclusion in a future block) and `archived`
//! (already committed, kept only to suppress re-gossip). A transaction
//! moved to `archived` is never re-pended.
//!
//! Owned by the node orchestrator and mutated only by its event loop and
//! the HTTP handlers it exposes — a single coarse lock is sufficient at
//! this scale, per `spec.md` §5.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::block::Block;
use crate::transaction::SignedTransaction;

#[derive(Default)]
pub struct Mempool {
    pending: Mutex<HashMap<String, SignedTransaction>>,
    archived: Mutex<HashMap<String, SignedTransaction>>,
}

impl Mempool {
    pub fn new() -> Self {
        Mempool::default()
    }

    /// Inserts `tx` into `pending` if its hash is not already present in
    /// either map. Returns `true` if it was newly inserted.
    pub fn add_pending(&self, tx: SignedTransaction) -> bool {
        let key = tx.unsigned.hash().to_hex();
        let mut pending = self.pending.lock();
        let mut archived = self.archived.lock();
        if pending.contains_key(&key) || archived.contains_key(&key) {
            return false;
        }
        pending.insert(key, tx);
        true
    }

    /// Moves every transaction in `block`'s payload that is currently
    /// pending into `archived`. This is how a committed block — whether
    /// mined locally or received from a peer — preempts re-mining of the
    /// transactions it already includes.
    pub fn archive_block(&self, block: &Block) {
        let mut pending = self.pending.lock();
        let mut archived = self.archived.lock();
        for tx in &block.payload {
            let key = tx.unsigned.hash().to_hex();
            if let Some(tx) = pending.remove(&key) {
                archived.insert(key, tx);
            }
        }
    }

    /// A snapshot of every pending transaction, for constructing a
    /// `PendingBlock` or reporting `pending_trxs` over HTTP.
    pub fn pending_snapshot(&self) -> Vec<SignedTransaction> {
        self.pending.lock().values().cloned().collect()
    }

    pub fn is_pending_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_archived(&self, key: &str) -> bool {
        self.archived.lock().contains_key(key)
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }
}
