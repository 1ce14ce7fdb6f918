//! # Peer registry
//!
//! A known-peer set keyed by `"{ip}:{port}"`. The bootstrap peer, if any,
//! is preloaded at construction already `connected`; every other peer
//! starts disconnected until the sync loop's join handshake succeeds.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::account::Account;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerNode {
    pub ip: String,
    pub port: u16,
    pub is_bootstrap: bool,
    pub account: Account,
    pub connected: bool,
}

impl PeerNode {
    pub fn new(ip: impl Into<String>, port: u16, account: Account, is_bootstrap: bool) -> Self {
        PeerNode {
            ip: ip.into(),
            port,
            is_bootstrap,
            account,
            connected: is_bootstrap,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// The set of peers a node knows about, keyed by address.
#[derive(Default)]
pub struct PeerRegistry {
    self_address: String,
    peers: RwLock<HashMap<String, PeerNode>>,
}

impl PeerRegistry {
    /// Builds a registry for a node listening at `self_ip:self_port`,
    /// optionally preloaded with a bootstrap peer (already `connected`).
    pub fn new(self_ip: &str, self_port: u16, bootstrap: Option<PeerNode>) -> Self {
        let self_address = format!("{self_ip}:{self_port}");
        let mut peers = HashMap::new();
        if let Some(peer) = bootstrap {
            peers.insert(peer.address(), peer);
        }
        PeerRegistry {
            self_address,
            peers: RwLock::new(peers),
        }
    }

    pub fn add(&self, peer: PeerNode) {
        if peer.address() == self.self_address {
            return;
        }
        self.peers.write().insert(peer.address(), peer);
    }

    pub fn delete(&self, address: &str) {
        self.peers.write().remove(address);
    }

    /// True iff `address` is already known, excluding our own address.
    pub fn is_known(&self, address: &str) -> bool {
        address != self.self_address && self.peers.read().contains_key(address)
    }

    pub fn mark_connected(&self, address: &str, connected: bool) {
        if let Some(peer) = self.peers.write().get_mut(address) {
            peer.connected = connected;
        }
    }

    pub fn snapshot(&self) -> Vec<PeerNode> {
        self.peers.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }
}
