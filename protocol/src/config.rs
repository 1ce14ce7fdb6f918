//! # Protocol Configuration & Constants
//!
//! Every magic number the ledger depends on lives here. If you're
//! hardcoding a tick interval or a path fragment somewhere else, move it
//! here instead.

// ---------------------------------------------------------------------------
// Data directory layout
// ---------------------------------------------------------------------------

/// Subdirectory of `dataDir` holding the genesis document and block log.
pub const DATABASE_DIR: &str = "database";

/// Genesis document filename, under `DATABASE_DIR`.
pub const GENESIS_FILE: &str = "genesis.json";

/// Block-log filename, under `DATABASE_DIR`.
pub const BLOCK_DB_FILE: &str = "block.db";

/// Keystore subdirectory of `dataDir`. Populated by the external signing
/// service stand-in; not read by the state engine or miner.
pub const KEYSTORE_DIR: &str = "keystore";

// ---------------------------------------------------------------------------
// Consensus parameters
// ---------------------------------------------------------------------------

/// Fixed credit applied to the miner's account on every committed block.
pub const BLOCK_REWARD: u64 = 100;

/// Reserved `data` value marking a transaction as a mint with no debit.
pub const REWARD_DATA: &str = "reward";

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Sync task tick interval: how often a node polls its known peers.
pub const SYNC_TICK_SECS: u64 = 45;

/// Mining supervisor tick interval: how often an idle node checks whether
/// the mempool has work and starts a fresh mining attempt.
pub const MINE_TICK_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Capacity of the `newPendingTRXs` notification channel.
pub const PENDING_TRX_CHANNEL_CAPACITY: usize = 10_000;

/// Capacity of the `newSyncedBlocks` channel feeding the mining supervisor.
pub const SYNCED_BLOCK_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Default HTTP port a node listens on when none is given on the CLI.
pub const DEFAULT_HTTP_PORT: u16 = 8080;
