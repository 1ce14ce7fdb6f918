//! # CLI Interface
//!
//! Defines the command-line argument structure for `ledger-node` using
//! `clap` derive, matching `spec.md` §6.1: inspect balances, submit a
//! transaction, run the node process, replay the block log, mint a
//! keystore account, or print the version.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ledger_protocol::account::Account;

/// Permissioned proof-of-work ledger node.
#[derive(Parser, Debug)]
#[command(name = "ledger-node", about = "Permissioned proof-of-work ledger node")]
pub struct LedgerNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the ledger node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect account balances.
    Balances {
        #[command(subcommand)]
        action: BalancesCommand,
    },
    /// Submit a transaction, signed with a keystore account.
    Trx {
        #[command(subcommand)]
        action: TrxCommand,
    },
    /// Start the node: HTTP server, sync loop, and mining supervisor.
    Run(RunArgs),
    /// Replay the on-disk block log and report the resulting tip.
    Migrate(MigrateArgs),
    /// Local keystore operations.
    Wallet {
        #[command(subcommand)]
        action: WalletCommand,
    },
    /// Print version information and exit.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum BalancesCommand {
    /// List every known balance as of the current tip.
    List(DataDirArgs),
}

#[derive(Subcommand, Debug)]
pub enum TrxCommand {
    /// Build, sign, and submit a transfer to a running node.
    Add(TrxAddArgs),
}

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Generate a fresh keypair and persist it in the local keystore.
    NewAccount(DataDirArgs),
}

#[derive(Parser, Debug)]
pub struct DataDirArgs {
    /// Path to the node data directory.
    #[arg(long)]
    pub datadir: PathBuf,
}

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Path to the node data directory.
    #[arg(long)]
    pub datadir: PathBuf,
}

#[derive(Parser, Debug)]
pub struct TrxAddArgs {
    /// Path to the node data directory. Unused by this command directly —
    /// signing happens on the receiving node, which must hold `--from`'s
    /// key in its own keystore — but kept for symmetry with the other
    /// subcommands and to locate a local keystore if `--to-keystore` is
    /// ever read instead of the remote node's.
    #[arg(long)]
    pub datadir: PathBuf,

    /// IP of the node to submit the transaction to.
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    /// Port of the node to submit the transaction to.
    #[arg(long, default_value_t = ledger_protocol::config::DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Sender account. Must have a matching secret key in the receiving
    /// node's keystore.
    #[arg(long)]
    pub from: Account,

    /// Recipient account.
    #[arg(long)]
    pub to: Account,

    /// Amount to transfer.
    #[arg(long)]
    pub value: u64,

    /// Arbitrary memo. `"reward"` is reserved and mints instead of
    /// debiting the sender — avoid it for ordinary transfers.
    #[arg(long, default_value = "")]
    pub data: String,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node data directory where the genesis document,
    /// block log, and keystore live.
    #[arg(long)]
    pub datadir: PathBuf,

    /// IP address this node listens and advertises itself on.
    #[arg(long)]
    pub ip: String,

    /// Port this node listens and advertises itself on.
    #[arg(long)]
    pub port: u16,

    /// Account credited with the block reward for blocks this node mines.
    #[arg(long)]
    pub miner: Account,

    /// IP of a bootstrap peer to dial on startup.
    #[arg(long)]
    pub bootstrap_ip: Option<String>,

    /// Port of a bootstrap peer to dial on startup.
    #[arg(long)]
    pub bootstrap_port: Option<u16>,

    /// Account of a bootstrap peer to dial on startup.
    #[arg(long)]
    pub bootstrap_account: Option<Account>,
}
