//! # Blocks
//!
//! A block is a header plus an ordered transaction payload. The block
//! hash is sha-256 over the canonical JSON of the *whole* block — header
//! and payload together, not a separate header-only hash — and there is
//! no Merkle root: the payload is hashed as a flat JSON array.

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::hash::{sha256_of_json, Hash};
use crate::transaction::SignedTransaction;

/// Block header. Field order matches `spec.md` §3/§6 exactly:
/// `parent, height, nonce, time, miner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent: Hash,
    pub height: u64,
    pub nonce: u32,
    pub time: u64,
    pub miner: Account,
}

/// A header plus its ordered transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Vec<SignedTransaction>,
}

impl Block {
    pub fn new(header: BlockHeader, payload: Vec<SignedTransaction>) -> Self {
        Block { header, payload }
    }

    pub fn parent(&self) -> Hash {
        self.header.parent
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn miner(&self) -> Account {
        self.header.miner
    }

    /// sha-256 of the canonical JSON encoding of the full block (header
    /// and payload together).
    pub fn hash(&self) -> Hash {
        sha256_of_json(self).expect("Block always serializes")
    }

    /// True iff this block's hash meets the fixed difficulty target.
    pub fn satisfies_difficulty(&self) -> bool {
        self.hash().satisfies_difficulty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Keypair;
    use crate::transaction::UnsignedTransaction;

    fn sample_block(height: u64, parent: Hash, nonce: u32) -> Block {
        let keypair = Keypair::generate();
        let to = Account::from_bytes([0x22; 20]);
        let signed = UnsignedTransaction::new(keypair.account(), to, 10, "").sign(&keypair);
        let header = BlockHeader {
            parent,
            height,
            nonce,
            time: 1,
            miner: keypair.account(),
        };
        Block::new(header, vec![signed])
    }

    #[test]
    fn hash_is_deterministic() {
        let block = sample_block(1, Hash::EMPTY, 7);
        assert_eq!(block.hash(), block.hash());
    }

    #[test]
    fn changing_nonce_changes_hash() {
        let a = sample_block(1, Hash::EMPTY, 7);
        let b = sample_block(1, Hash::EMPTY, 8);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn changing_payload_changes_hash() {
        let a = sample_block(1, Hash::EMPTY, 7);
        let mut b = a.clone();
        b.payload.clear();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn header_field_order_matches_wire_format() {
        let block = sample_block(3, Hash::EMPTY, 1);
        let json = serde_json::to_string(&block.header).unwrap();
        let parent_idx = json.find("\"parent\"").unwrap();
        let height_idx = json.find("\"height\"").unwrap();
        let nonce_idx = json.find("\"nonce\"").unwrap();
        let time_idx = json.find("\"time\"").unwrap();
        let miner_idx = json.find("\"miner\"").unwrap();
        assert!(parent_idx < height_idx);
        assert!(height_idx < nonce_idx);
        assert!(nonce_idx < time_idx);
        assert!(time_idx < miner_idx);
    }

    #[test]
    fn serde_round_trip() {
        let block = sample_block(2, Hash::EMPTY, 42);
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, back);
        assert_eq!(block.hash(), back.hash());
    }
}
