// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Protocol — Core Library
//!
//! A permissioned proof-of-work ledger: a small set of known miners extend
//! a shared chain by finding a nonce that pushes a block's hash under a
//! fixed difficulty target, while an in-process state engine replays the
//! resulting block log to track account balances.
//!
//! There is no peer discovery, no gossip mesh, and no consensus vote — a
//! node simply polls the peers it was told about over plain HTTP and
//! adopts whichever longer, still-valid chain it is handed. The trust
//! model is "every miner account is already known and vetted"; this
//! library does not try to defend against a malicious miner minting
//! reward transactions it isn't entitled to (see `DESIGN.md`).
//!
//! ## Architecture
//!
//! - **hash** — the 32-byte `Hash` type, sha-256 helpers, and the
//!   difficulty predicate mined blocks must satisfy.
//! - **account** — secp256k1 keypairs, Keccak-256 address derivation, and
//!   the local keystore stand-in used by the CLI.
//! - **transaction** — unsigned/signed transactions, canonical encoding,
//!   signing, and authenticity verification.
//! - **block** — block headers, genesis construction, canonical encoding.
//! - **genesis** — the genesis document and fresh-data-directory layout.
//! - **fs** — a filesystem capability trait, so the block log can be
//!   tested without touching disk.
//! - **blocklog** — the append-only newline-delimited block log on disk.
//! - **state** — the state engine: replay, validate, apply, balances.
//! - **mempool** — pending/archived transaction bookkeeping.
//! - **miner** — the nonce search, cancellable mid-attempt.
//! - **peer** — the known-peer registry.
//! - **wire** — JSON request/response shapes for the HTTP surface.
//! - **sync** — the peer-polling sync loop.
//! - **node** — the orchestrator tying all of the above into a process.
//! - **config** — protocol constants and tuning parameters.

pub mod account;
pub mod block;
pub mod blocklog;
pub mod config;
pub mod fs;
pub mod genesis;
pub mod hash;
pub mod mempool;
pub mod miner;
pub mod node;
pub mod peer;
pub mod state;
pub mod sync;
pub mod transaction;
pub mod wire;
