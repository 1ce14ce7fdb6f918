//! # State engine
//!
//! A deterministic ledger: replays the block log under the genesis
//! allocation, validates and applies new blocks against balance and
//! ordering invariants, and commits them atomically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::account::Account;
use crate::block::Block;
use crate::blocklog::{self, BlockLogError, BlockRecord};
use crate::config::{BLOCK_REWARD, DATABASE_DIR, GENESIS_FILE, BLOCK_DB_FILE};
use crate::fs::DataFs;
use crate::genesis::{Genesis, GenesisError};
use crate::hash::Hash;
use crate::transaction::SignedTransaction;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Genesis(#[from] GenesisError),
    #[error(transparent)]
    BlockLog(#[from] BlockLogError),
    #[error("block height {actual} does not follow expected height {expected}")]
    BadHeight { expected: u64, actual: u64 },
    #[error("block parent {actual} does not match tip {expected}")]
    BadParent { expected: Hash, actual: Hash },
    #[error("block hash {0} does not satisfy the difficulty predicate")]
    BadPow(Hash),
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error("insufficient balance: {from} -> {to} value {value}")]
    InsufficientBalance { from: Account, to: Account, value: u64 },
    #[error("transaction signature does not match declared sender")]
    Forged,
}

/// The ledger's in-memory view, backed by a genesis document and an
/// append-only block log.
pub struct State {
    fs: Arc<dyn DataFs>,
    data_dir: PathBuf,
    genesis_path: PathBuf,
    block_log_path: PathBuf,
    balances: HashMap<Account, u64>,
    latest_block: Option<Block>,
    latest_block_hash: Hash,
    has_genesis_block: bool,
}

impl State {
    /// Opens the state engine rooted at `data_dir`. If the directory has
    /// no genesis document yet, one is written (empty balance map) before
    /// loading. The full block log is then replayed: the first record is
    /// exempt from the parent-link check (see `apply_checked`), every
    /// subsequent record must link to its predecessor.
    pub fn open(fs: Arc<dyn DataFs>, data_dir: PathBuf) -> Result<Self, StateError> {
        let database_dir = data_dir.join(DATABASE_DIR);
        let genesis_path = database_dir.join(GENESIS_FILE);
        let block_log_path = database_dir.join(BLOCK_DB_FILE);

        if !fs.exists(&genesis_path) {
            fs.create_dir_all(&database_dir)?;
            let genesis = Genesis {
                genesis_time: unix_seconds().to_string(),
                chain_id: "ledger-devnet".to_string(),
                balances: HashMap::new(),
            };
            genesis.write(fs.as_ref(), &genesis_path)?;
        }

        let genesis = Genesis::load(fs.as_ref(), &genesis_path)?;
        let mut balances = genesis.balances;
        let mut latest_block: Option<Block> = None;
        let mut latest_block_hash = Hash::EMPTY;
        let mut has_genesis_block = false;

        let records = blocklog::scan_from(fs.as_ref(), &block_log_path, Hash::EMPTY)?;
        for record in records {
            apply_checked(
                &record.block,
                &mut balances,
                has_genesis_block,
                latest_block.as_ref(),
                latest_block_hash,
            )?;
            has_genesis_block = true;
            latest_block_hash = record.hash;
            latest_block = Some(record.block);
        }

        Ok(State {
            fs,
            data_dir,
            genesis_path,
            block_log_path,
            balances,
            latest_block,
            latest_block_hash,
            has_genesis_block,
        })
    }

    /// Validates and commits `block`, returning its hash. On any
    /// validation error the state is left exactly as it was; a write
    /// failure while appending the record also leaves the state
    /// unchanged and surfaces as `StateError::Io`.
    pub fn add_block(&mut self, block: Block) -> Result<Hash, StateError> {
        let mut pending = self.balances.clone();
        apply_checked(
            &block,
            &mut pending,
            self.has_genesis_block,
            self.latest_block.as_ref(),
            self.latest_block_hash,
        )?;

        let hash = block.hash();
        let record = BlockRecord {
            hash,
            block: block.clone(),
        };
        blocklog::append(self.fs.as_ref(), &self.block_log_path, &record)?;

        self.balances = pending;
        self.latest_block_hash = hash;
        self.has_genesis_block = true;
        self.latest_block = Some(block);
        Ok(hash)
    }

    /// Folds `add_block` over `blocks`, aborting on the first error.
    /// Blocks committed before the failing one remain committed.
    pub fn add_blocks(&mut self, blocks: Vec<Block>) -> Result<(), StateError> {
        for block in blocks {
            self.add_block(block)?;
        }
        Ok(())
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.latest_block.as_ref()
    }

    pub fn latest_block_hash(&self) -> Hash {
        self.latest_block_hash
    }

    /// 0 if no block has ever been applied, else the tip height + 1.
    pub fn next_block_height(&self) -> u64 {
        match &self.latest_block {
            Some(block) => block.height() + 1,
            None => 0,
        }
    }

    /// A snapshot of current balances.
    pub fn balances(&self) -> HashMap<Account, u64> {
        self.balances.clone()
    }

    pub fn balance_of(&self, account: Account) -> u64 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn genesis_path(&self) -> &Path {
        &self.genesis_path
    }

    pub fn block_log_path(&self) -> &Path {
        &self.block_log_path
    }

    pub fn fs(&self) -> &Arc<dyn DataFs> {
        &self.fs
    }

    /// Replays blocks strictly after `from` from the on-disk log, for
    /// serving `GET /node/sync` to a peer. Does not touch in-memory
    /// state; safe to call while another block is mid-application.
    pub fn blocks_from(&self, from: Hash) -> Result<Vec<Block>, StateError> {
        let records = blocklog::scan_from(self.fs.as_ref(), &self.block_log_path, from)?;
        Ok(records.into_iter().map(|r| r.block).collect())
    }

    /// Closes the state engine. There is no buffered handle to flush —
    /// every append is already durable by the time `add_block` returns —
    /// so this simply drops the engine.
    pub fn close(self) {}
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

/// Validates `block` against the current tip and, if valid, applies its
/// payload and block reward to `balances` in place.
///
/// `has_genesis_block` being false exempts the block from both the
/// height and parent-link checks entirely (the replay relaxation for the
/// very first block ever applied). Once true, height is always checked,
/// but the parent-link check is further gated on the *previous* tip's
/// height being greater than zero — this tolerates the first mined block
/// built on top of a freshly initialized chain, per `spec.md` §4.4.
fn apply_checked(
    block: &Block,
    balances: &mut HashMap<Account, u64>,
    has_genesis_block: bool,
    latest_block: Option<&Block>,
    latest_block_hash: Hash,
) -> Result<(), StateError> {
    if has_genesis_block {
        let latest = latest_block.expect("has_genesis_block implies a recorded tip");
        let expected_height = latest.height() + 1;
        if block.height() != expected_height {
            return Err(StateError::BadHeight {
                expected: expected_height,
                actual: block.height(),
            });
        }
        if latest.height() > 0 && block.parent() != latest_block_hash {
            return Err(StateError::BadParent {
                expected: latest_block_hash,
                actual: block.parent(),
            });
        }
    }

    if !block.satisfies_difficulty() {
        return Err(StateError::BadPow(block.hash()));
    }

    apply_transactions(&block.payload, balances)?;
    *balances.entry(block.miner()).or_insert(0) += BLOCK_REWARD;
    Ok(())
}

/// Applies `payload` in ascending-`time` order, per `spec.md` §4.4.
fn apply_transactions(
    payload: &[SignedTransaction],
    balances: &mut HashMap<Account, u64>,
) -> Result<(), StateError> {
    let mut ordered: Vec<&SignedTransaction> = payload.iter().collect();
    ordered.sort_by_key(|tx| tx.time());
    for tx in ordered {
        apply_transaction(tx, balances)?;
    }
    Ok(())
}

/// Validates and applies one signed transaction.
///
/// Field validation runs before the signature-recovery check: an empty
/// `from`/`to` or zero `value` can never recover to a real signer, so
/// checking fields first is what actually surfaces `InvalidField` rather
/// than `Forged` for those malformed inputs (see `spec.md` §8 S4).
fn apply_transaction(
    tx: &SignedTransaction,
    balances: &mut HashMap<Account, u64>,
) -> Result<(), StateError> {
    if tx.from().is_empty() {
        return Err(StateError::InvalidField("From".to_string()));
    }
    if tx.to().is_empty() {
        return Err(StateError::InvalidField("To".to_string()));
    }
    if tx.value() == 0 {
        return Err(StateError::InvalidField("Value".to_string()));
    }
    if !tx.is_authentic() {
        return Err(StateError::Forged);
    }

    if tx.is_reward() {
        *balances.entry(tx.to()).or_insert(0) += tx.value();
    } else {
        let available = balances.get(&tx.from()).copied().unwrap_or(0);
        if available < tx.value() {
            return Err(StateError::InsufficientBalance {
                from: tx.from(),
                to: tx.to(),
                value: tx.value(),
            });
        }
        *balances.entry(tx.from()).or_insert(0) -= tx.value();
        *balances.entry(tx.to()).or_insert(0) += tx.value();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Keypair;
    use crate::block::BlockHeader;
    use crate::fs::InMemoryFs;
    use crate::transaction::UnsignedTransaction;

    fn open_state_with_balance(account: Account, balance: u64) -> State {
        let fs: Arc<dyn DataFs> = Arc::new(InMemoryFs::new());
        let data_dir = PathBuf::from("/data");
        let mut genesis_balances = HashMap::new();
        genesis_balances.insert(account, balance);
        let genesis = Genesis {
            genesis_time: "0".to_string(),
            chain_id: "test".to_string(),
            balances: genesis_balances,
        };
        let genesis_path = data_dir.join(DATABASE_DIR).join(GENESIS_FILE);
        fs.create_dir_all(&data_dir.join(DATABASE_DIR)).unwrap();
        genesis.write(fs.as_ref(), &genesis_path).unwrap();
        State::open(fs, data_dir).unwrap()
    }

    fn mine_block(state: &State, miner: &Keypair, trxs: Vec<SignedTransaction>) -> Block {
        let parent = state.latest_block_hash();
        let height = state.next_block_height();
        let time = 1;
        for nonce in 0..u32::MAX {
            let header = BlockHeader {
                parent,
                height,
                nonce,
                time,
                miner: miner.account(),
            };
            let block = Block::new(header, trxs.clone());
            if block.satisfies_difficulty() {
                return block;
            }
        }
        unreachable!("difficulty target should be found well within u32 range in tests")
    }

    #[test]
    fn fresh_data_dir_gets_an_empty_genesis() {
        let fs: Arc<dyn DataFs> = Arc::new(InMemoryFs::new());
        let state = State::open(fs, PathBuf::from("/data")).unwrap();
        assert!(state.balances().is_empty());
        assert_eq!(state.next_block_height(), 0);
        assert!(state.latest_block_hash().is_empty());
    }

    // S2 from the scenario catalogue.
    #[test]
    fn s2_replay_determinism() {
        let sender = Keypair::generate();
        let receiver_account = Account::from_bytes([0xbb; 20]);
        let miner = Keypair::generate();

        let mut state = open_state_with_balance(sender.account(), 1_000_000);

        let signed = UnsignedTransaction::new(sender.account(), receiver_account, 2000, "")
            .sign(&sender);
        let block = mine_block(&state, &miner, vec![signed]);
        let hash = state.add_block(block).unwrap();

        assert_eq!(state.balance_of(sender.account()), 998_000);
        assert_eq!(state.balance_of(receiver_account), 2000);
        assert_eq!(state.balance_of(miner.account()), BLOCK_REWARD);
        assert_eq!(state.latest_block_hash(), hash);
        assert_eq!(state.next_block_height(), 1);

        // Replaying from disk reproduces the exact same state.
        let fs = Arc::clone(&state.fs);
        let data_dir = state.data_dir().to_path_buf();
        let replayed = State::open(fs, data_dir).unwrap();
        assert_eq!(replayed.balances(), state.balances());
        assert_eq!(replayed.latest_block_hash(), state.latest_block_hash());
    }

    // S3 from the scenario catalogue.
    #[test]
    fn s3_insufficient_balance_leaves_state_untouched() {
        let sender = Keypair::generate();
        let receiver = Account::from_bytes([0x01; 20]);
        let miner = Keypair::generate();
        let mut state = open_state_with_balance(sender.account(), 0);

        let signed = UnsignedTransaction::new(sender.account(), receiver, 1, "").sign(&sender);
        let block = mine_block(&state, &miner, vec![signed]);

        let before = state.balances();
        let before_tip = state.latest_block_hash();
        let err = state.add_block(block).unwrap_err();

        assert!(matches!(
            err,
            StateError::InsufficientBalance { value: 1, .. }
        ));
        assert_eq!(state.balances(), before);
        assert_eq!(state.latest_block_hash(), before_tip);
    }

    // S4 from the scenario catalogue.
    #[test]
    fn s4_invalid_field_variants() {
        let sender = Keypair::generate();
        let other = Account::from_bytes([0x02; 20]);
        let mut balances = HashMap::new();
        balances.insert(sender.account(), 10);

        let empty_from =
            UnsignedTransaction::new(Account::EMPTY, other, 1, "").sign(&sender);
        assert!(matches!(
            apply_transaction(&empty_from, &mut balances.clone()),
            Err(StateError::InvalidField(ref f)) if f == "From"
        ));

        let empty_to =
            UnsignedTransaction::new(sender.account(), Account::EMPTY, 1, "").sign(&sender);
        assert!(matches!(
            apply_transaction(&empty_to, &mut balances.clone()),
            Err(StateError::InvalidField(ref f)) if f == "To"
        ));

        let zero_value = UnsignedTransaction::new(sender.account(), other, 0, "").sign(&sender);
        assert!(matches!(
            apply_transaction(&zero_value, &mut balances.clone()),
            Err(StateError::InvalidField(ref f)) if f == "Value"
        ));
    }

    #[test]
    fn forged_signature_is_rejected_by_apply() {
        let declared_sender = Keypair::generate();
        let actual_signer = Keypair::generate();
        let other = Account::from_bytes([0x03; 20]);

        let unsigned = UnsignedTransaction::new(declared_sender.account(), other, 5, "");
        let digest = *unsigned.hash().as_bytes();
        let forged_sig = actual_signer.sign_digest(&digest);
        let forged = SignedTransaction {
            unsigned,
            signature: crate::transaction::SignatureBytes::from_recoverable(&forged_sig),
        };

        let mut balances = HashMap::new();
        balances.insert(declared_sender.account(), 100);
        let err = apply_transaction(&forged, &mut balances).unwrap_err();
        assert!(matches!(err, StateError::Forged));
    }

    #[test]
    fn reward_transaction_mints_without_debit() {
        let miner = Account::from_bytes([0x04; 20]);
        let keypair = Keypair::generate();
        // A reward-tagged transaction must still carry a non-empty `from`
        // to pass field validation — use the signer's own account rather
        // than `Account::EMPTY` (see DESIGN.md).
        let unsigned = UnsignedTransaction {
            from: keypair.account(),
            to: miner,
            value: 100,
            data: "reward".to_string(),
            time: 1,
        };
        let reward = unsigned.sign(&keypair);

        let mut balances = HashMap::new();
        balances.insert(keypair.account(), 5);
        apply_transaction(&reward, &mut balances).unwrap();
        assert_eq!(balances[&miner], 100);
        assert_eq!(balances[&keypair.account()], 5);
    }

    #[test]
    fn bad_height_is_rejected() {
        let miner = Keypair::generate();
        let receiver = Account::from_bytes([0x05; 20]);
        let signer = Keypair::generate();
        let mut state = open_state_with_balance(signer.account(), 10);

        let signed = UnsignedTransaction::new(signer.account(), receiver, 1, "").sign(&signer);
        let mut block = mine_block(&state, &miner, vec![signed]);
        block.header.height = 41; // anything but the expected 0
        // Re-mine at the wrong height so it still satisfies PoW.
        for nonce in 0..u32::MAX {
            block.header.nonce = nonce;
            if block.satisfies_difficulty() {
                break;
            }
        }
        let err = state.add_block(block).unwrap_err();
        assert!(matches!(err, StateError::BadHeight { .. }));
    }

    #[test]
    fn bad_parent_is_rejected_once_tip_height_exceeds_zero() {
        let miner = Keypair::generate();
        let signer = Keypair::generate();
        let mut state = open_state_with_balance(signer.account(), 10_000);

        // First block: height 0, relaxation applies regardless of parent.
        let tx1 = UnsignedTransaction::new(signer.account(), miner.account(), 1, "").sign(&signer);
        let block1 = mine_block(&state, &miner, vec![tx1]);
        state.add_block(block1).unwrap();

        // Second block: tip height is still 0, so the parent-link check
        // is skipped too (see apply_checked's doc comment).
        let tx2 = UnsignedTransaction::new(signer.account(), miner.account(), 1, "").sign(&signer);
        let mut block2 = mine_block(&state, &miner, vec![tx2]);
        block2.header.parent = Hash::EMPTY;
        for nonce in 0..u32::MAX {
            block2.header.nonce = nonce;
            if block2.satisfies_difficulty() {
                break;
            }
        }
        state.add_block(block2).unwrap();

        // Third block: tip height is now 1 (> 0), so a mismatched parent
        // is rejected.
        let tx3 = UnsignedTransaction::new(signer.account(), miner.account(), 1, "").sign(&signer);
        let mut block3 = mine_block(&state, &miner, vec![tx3]);
        block3.header.parent = Hash::EMPTY;
        for nonce in 0..u32::MAX {
            block3.header.nonce = nonce;
            if block3.satisfies_difficulty() {
                break;
            }
        }
        let err = state.add_block(block3).unwrap_err();
        assert!(matches!(err, StateError::BadParent { .. }));
    }
}
