//! # Genesis
//!
//! The genesis document fixes the chain's initial balance allocation. It
//! is loaded once at state-engine boot and never touched again — there is
//! no "genesis block" in the block log, only this side document.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::Account;
use crate::fs::DataFs;

/// `{ "genesis_time": "...", "chain_id": "...", "balances": { "0x...": n, ... } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub genesis_time: String,
    pub chain_id: String,
    pub balances: HashMap<Account, u64>,
}

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("genesis io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed genesis JSON: {0}")]
    Codec(#[from] serde_json::Error),
}

impl Genesis {
    /// Loads and parses the genesis document at `path`. A missing file or
    /// malformed JSON both fail with `GenesisError`.
    pub fn load(fs: &dyn DataFs, path: &Path) -> Result<Self, GenesisError> {
        let contents = fs.read_to_string(path)?;
        let genesis: Genesis = serde_json::from_str(&contents)?;
        Ok(genesis)
    }

    /// Writes this document to `path` as pretty JSON.
    pub fn write(&self, fs: &dyn DataFs, path: &Path) -> Result<(), GenesisError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs.write(path, &contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::path::PathBuf;

    fn sample_genesis() -> Genesis {
        let mut balances = HashMap::new();
        balances.insert(Account::from_bytes([0xaa; 20]), 1_000_000);
        Genesis {
            genesis_time: "2026-01-01T00:00:00Z".to_string(),
            chain_id: "ledger-devnet".to_string(),
            balances,
        }
    }

    #[test]
    fn round_trips_through_fs() {
        let fs = InMemoryFs::new();
        let path = PathBuf::from("/data/database/genesis.json");
        let genesis = sample_genesis();
        genesis.write(&fs, &path).unwrap();

        let loaded = Genesis::load(&fs, &path).unwrap();
        assert_eq!(loaded, genesis);
    }

    #[test]
    fn missing_file_fails() {
        let fs = InMemoryFs::new();
        let err = Genesis::load(&fs, Path::new("/data/database/genesis.json")).unwrap_err();
        assert!(matches!(err, GenesisError::Io(_)));
    }

    #[test]
    fn malformed_json_fails() {
        let fs = InMemoryFs::new();
        let path = PathBuf::from("/data/database/genesis.json");
        fs.write(&path, "not json").unwrap();
        let err = Genesis::load(&fs, &path).unwrap_err();
        assert!(matches!(err, GenesisError::Codec(_)));
    }
}
