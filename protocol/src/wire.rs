//! # Wire protocol
//!
//! JSON request/response shapes for the five HTTP endpoints in
//! `spec.md` §6, shared between the `axum` handlers (server side, in the
//! `node` binary) and the sync loop's `reqwest` client (client side, in
//! `sync.rs`) so the two can never drift apart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::block::Block;
use crate::hash::Hash;
use crate::peer::PeerNode;
use crate::transaction::SignedTransaction;

/// `GET /balances/list` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancesListRes {
    pub block_hash: Hash,
    pub balances: HashMap<Account, u64>,
}

/// `POST /trx/add` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrxReq {
    pub from: Account,
    pub to: Account,
    pub value: u64,
    pub data: String,
}

/// `POST /trx/add` response. The transaction has only entered the
/// mempool at this point — no block has been mined yet — so the
/// response is a plain success flag rather than a block hash (see
/// `DESIGN.md`, Open Question 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrxRes {
    pub success: bool,
}

/// `GET /node/status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRes {
    pub block_hash: Hash,
    pub block_height: u64,
    pub peers_known: Vec<PeerNode>,
    pub pending_trxs: Vec<SignedTransaction>,
}

/// `GET /node/sync?fromBlock=<hex32>` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRes {
    pub blocks: Vec<Block>,
}

/// `GET /node/sync` query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQuery {
    #[serde(rename = "fromBlock")]
    pub from_block: Hash,
}

/// `GET /node/peer?ip=&port=&miner=` query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPeerQuery {
    pub ip: String,
    pub port: u16,
    pub miner: Account,
}

/// `GET /node/peer` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPeerRes {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// The uniform `500` error envelope used by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRes {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_trx_res_serializes_as_bare_success_flag() {
        let res = AddTrxRes { success: true };
        assert_eq!(serde_json::to_string(&res).unwrap(), r#"{"success":true}"#);
    }

    #[test]
    fn add_peer_res_omits_error_when_successful() {
        let res = AddPeerRes {
            success: true,
            error: None,
        };
        assert_eq!(serde_json::to_string(&res).unwrap(), r#"{"success":true}"#);
    }

    #[test]
    fn add_peer_res_includes_error_when_present() {
        let res = AddPeerRes {
            success: false,
            error: Some("peer limit reached".to_string()),
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("\"error\":\"peer limit reached\""));
    }

    #[test]
    fn sync_query_reads_camelcase_from_block() {
        let zero_hash = "0".repeat(64);
        let json = format!(r#"{{"fromBlock":"{zero_hash}"}}"#);
        let query: SyncQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(query.from_block, Hash::EMPTY);
    }
}
