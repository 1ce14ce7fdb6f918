// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Node
//!
//! Entry point for the `ledger-node` binary. Parses CLI arguments and
//! dispatches to one of six subcommands:
//!
//! - `balances list` — print every account's balance as of the current tip
//! - `trx add`       — sign and submit a transaction to a running node
//! - `run`           — start the node: HTTP server, sync loop, miner
//! - `migrate`       — replay the on-disk block log and report the tip
//! - `wallet new-account` — mint a keystore entry
//! - `version`       — print build version information

mod api;
mod cli;
mod logging;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use ledger_protocol::account::LocalKeystore;
use ledger_protocol::config::KEYSTORE_DIR;
use ledger_protocol::fs::OsFs;
use ledger_protocol::mempool::Mempool;
use ledger_protocol::node::Node;
use ledger_protocol::peer::{PeerNode, PeerRegistry};
use ledger_protocol::state::State;
use ledger_protocol::wire::{AddTrxReq, AddTrxRes};

use cli::{BalancesCommand, Commands, LedgerNodeCli, MigrateArgs, RunArgs, TrxAddArgs, TrxCommand, WalletCommand};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LedgerNodeCli::parse();

    match cli.command {
        Commands::Balances {
            action: BalancesCommand::List(args),
        } => balances_list(&args.datadir),
        Commands::Trx {
            action: TrxCommand::Add(args),
        } => trx_add(args).await,
        Commands::Run(args) => run_node(args).await,
        Commands::Migrate(args) => migrate(&args),
        Commands::Wallet {
            action: WalletCommand::NewAccount(args),
        } => wallet_new_account(&args.datadir),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// balances list
// ---------------------------------------------------------------------------

fn balances_list(data_dir: &Path) -> Result<()> {
    let fs = Arc::new(OsFs);
    let state = State::open(fs, data_dir.to_path_buf())
        .with_context(|| format!("failed to open state at {}", data_dir.display()))?;

    println!();
    println!("*** Account Balances ***");
    println!("________________________");
    for (account, balance) in state.balances() {
        println!("* {account}\t|\t{balance}");
    }
    println!("------------------------");
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// trx add
// ---------------------------------------------------------------------------

/// Submits a transaction to a running node over HTTP. Signing happens on
/// the receiving node — it must hold `--from`'s key in its own keystore;
/// see `ledger_node::api::trx_add`.
async fn trx_add(args: TrxAddArgs) -> Result<()> {
    let url = format!("http://{}:{}/trx/add", args.ip, args.port);
    let client = reqwest::Client::new();
    let req = AddTrxReq {
        from: args.from,
        to: args.to,
        value: args.value,
        data: args.data,
    };

    let res: AddTrxRes = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .with_context(|| format!("failed to reach node at {url}"))?
        .error_for_status()
        .with_context(|| format!("node at {url} rejected the transaction"))?
        .json()
        .await
        .context("node response was not valid JSON")?;

    if res.success {
        println!("transaction successfully submitted");
    } else {
        anyhow::bail!("node declined the transaction");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn run_node(args: RunArgs) -> Result<()> {
    logging::init_logging("ledger_node=info,ledger_protocol=info", LogFormat::Pretty);

    tracing::info!(
        ip = %args.ip,
        port = args.port,
        miner = %args.miner,
        datadir = %args.datadir.display(),
        "starting ledger-node"
    );

    let fs = Arc::new(OsFs);
    let state = State::open(fs, args.datadir.clone())
        .with_context(|| format!("failed to open state at {}", args.datadir.display()))?;
    tracing::info!(
        height = state.latest_block().map(|b| b.height()).unwrap_or(0),
        "state replayed from block log"
    );

    let bootstrap = match (&args.bootstrap_ip, args.bootstrap_port, args.bootstrap_account) {
        (Some(ip), Some(port), Some(account)) => Some(PeerNode::new(ip.clone(), port, account, true)),
        (None, None, None) => None,
        _ => anyhow::bail!("--bootstrap-ip, --bootstrap-port, and --bootstrap-account must all be given together"),
    };
    let peers = PeerRegistry::new(&args.ip, args.port, bootstrap);

    let info = PeerNode::new(args.ip.clone(), args.port, args.miner, false);
    let node = Node::new(info, state, peers, Mempool::new());

    let keystore = Arc::new(LocalKeystore::new(args.datadir.join(KEYSTORE_DIR)));
    let app_state = api::AppState {
        node: Arc::clone(&node),
        keystore,
    };

    let router = api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind((args.ip.as_str(), args.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", args.ip, args.port))?;
    tracing::info!("HTTP server listening on {}:{}", args.ip, args.port);

    let cancel = CancellationToken::new();
    let (sync_handle, mining_handle) = node.run(cancel.clone());

    tokio::select! {
        res = axum::serve(listener, router) => {
            if let Err(err) = res {
                tracing::error!(error = %err, "HTTP server error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    cancel.cancel();
    let _ = sync_handle.await;
    let _ = mining_handle.await;
    tracing::info!("ledger-node stopped");

    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// ---------------------------------------------------------------------------
// migrate
// ---------------------------------------------------------------------------

/// Re-runs `State::open`, which replays the full block log from scratch,
/// and reports the resulting tip — in the spirit of `tbbmigrate`, whose
/// Go counterpart rebuilds the chain from a hardcoded set of blocks. Here
/// there is no separate migration format to apply: the block log is the
/// single source of truth, so "migrating" it is simply re-validating it.
fn migrate(args: &MigrateArgs) -> Result<()> {
    let fs = Arc::new(OsFs);
    let state = State::open(fs, args.datadir.clone())
        .with_context(|| format!("failed to open state at {}", args.datadir.display()))?;

    let height = state.latest_block().map(|b| b.height()).unwrap_or(0);
    println!("Migration complete.");
    println!("  Block height : {height}");
    println!("  Tip hash     : {}", state.latest_block_hash());

    Ok(())
}

// ---------------------------------------------------------------------------
// wallet new-account
// ---------------------------------------------------------------------------

fn wallet_new_account(data_dir: &Path) -> Result<()> {
    let keystore = LocalKeystore::new(data_dir.join(KEYSTORE_DIR));
    let account = keystore
        .new_keystore_account()
        .context("failed to generate and persist a new keystore account")?;

    println!("New account created: {account}");
    Ok(())
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

fn print_version() {
    println!("ledger-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc       {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_protocol::account::Account;

    #[test]
    fn balances_list_reports_genesis_balances() {
        let dir = tempfile::tempdir().unwrap();
        balances_list(dir.path()).unwrap();
    }

    #[test]
    fn wallet_new_account_persists_key() {
        let dir = tempfile::tempdir().unwrap();
        wallet_new_account(dir.path()).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path().join(KEYSTORE_DIR))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn migrate_reports_genesis_tip_on_fresh_dir() {
        let dir = tempfile::tempdir().unwrap();
        migrate(&MigrateArgs {
            datadir: dir.path().to_path_buf(),
        })
        .unwrap();
    }

    #[test]
    fn bootstrap_flags_require_all_three() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            datadir: dir.path().to_path_buf(),
            ip: "127.0.0.1".to_string(),
            port: 0,
            miner: Account::EMPTY,
            bootstrap_ip: Some("127.0.0.1".to_string()),
            bootstrap_port: None,
            bootstrap_account: None,
        };
        match (&args.bootstrap_ip, args.bootstrap_port, args.bootstrap_account) {
            (Some(_), None, None) => {}
            _ => panic!("expected partial bootstrap flags"),
        }
    }
}
