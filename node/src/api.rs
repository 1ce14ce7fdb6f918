//! # HTTP API
//!
//! Builds the axum router exposing the five endpoints in `spec.md` §6.
//! All handlers share application state through axum's `State`
//! extractor; the heavy lifting — validation, replay, mempool
//! bookkeeping — lives in `ledger_protocol::node::Node`, so handlers
//! here are thin adapters between JSON and the library's plain method
//! calls.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ledger_protocol::account::{KeystoreError, LocalKeystore};
use ledger_protocol::node::Node;
use ledger_protocol::peer::PeerNode;
use ledger_protocol::state::StateError;
use ledger_protocol::transaction::UnsignedTransaction;
use ledger_protocol::wire::{
    AddPeerQuery, AddPeerRes, AddTrxReq, AddTrxRes, BalancesListRes, ErrorRes, SyncQuery, SyncRes,
};

/// Shared application state available to every request handler. Cheap
/// to clone — both fields are `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<Node>,
    pub keystore: Arc<LocalKeystore>,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorRes {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Builds the full axum [`Router`] with every route in `spec.md` §6,
/// plus CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/balances/list", get(balances_list))
        .route("/trx/add", post(trx_add))
        .route("/node/status", get(node_status))
        .route("/node/sync", get(node_sync))
        .route("/node/peer", get(node_peer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /balances/list`
async fn balances_list(State(state): State<AppState>) -> Json<BalancesListRes> {
    let (block_hash, balances) = state.node.balances_snapshot();
    Json(BalancesListRes {
        block_hash,
        balances,
    })
}

/// `POST /trx/add` — builds, signs (via the keystore entry for
/// `req.from`), and submits a transaction to the mempool. The caller
/// never sends a signature directly; see `spec.md` §6.2.
async fn trx_add(
    State(state): State<AppState>,
    Json(req): Json<AddTrxReq>,
) -> Result<Json<AddTrxRes>, ApiError> {
    let keypair = state.keystore.load(req.from)?;
    let tx = UnsignedTransaction::new(req.from, req.to, req.value, req.data).sign(&keypair);
    let success = state.node.add_pending_trx(tx);
    Ok(Json(AddTrxRes { success }))
}

/// `GET /node/status`
async fn node_status(State(state): State<AppState>) -> Json<ledger_protocol::wire::StatusRes> {
    Json(state.node.status())
}

/// `GET /node/sync?fromBlock=<hex32>`
async fn node_sync(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<SyncRes>, ApiError> {
    let blocks = state.node.blocks_from(query.from_block)?;
    Ok(Json(SyncRes { blocks }))
}

/// `GET /node/peer?ip=&port=&miner=` — the join handshake: a peer that
/// reaches this endpoint is recorded as already connected, since
/// reaching it at all proves reachability in both directions.
async fn node_peer(
    State(state): State<AppState>,
    Query(query): Query<AddPeerQuery>,
) -> Json<AddPeerRes> {
    let mut peer = PeerNode::new(query.ip, query.port, query.miner, false);
    peer.connected = true;
    state.node.add_known_peer(peer);
    Json(AddPeerRes {
        success: true,
        error: None,
    })
}
