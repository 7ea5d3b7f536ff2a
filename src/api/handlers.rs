//! REST API handlers for ledger operations

use crate::core::{Block, ChainSnapshot, Transaction};
use crate::error::ValidationError;
use crate::mining::MiningError;
use crate::network::Node;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub node: Arc<Node>,
}

impl ApiState {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub node_id: String,
    pub height: usize,
}

#[derive(Serialize)]
pub struct TransactionCreated {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize)]
pub struct PendingResponse {
    pub pending_transactions: usize,
    pub transactions: Vec<Transaction>,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl From<Block> for MineResponse {
    fn from(block: Block) -> Self {
        Self {
            message: "New Block Forged".to_string(),
            index: block.index,
            transactions: block.transactions,
            proof: block.proof,
            previous_hash: block.previous_hash,
        }
    }
}

#[derive(Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub blocks_checked: usize,
    pub message: String,
}

#[derive(Serialize)]
pub struct PeersResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<(StatusCode, Json<T>), (StatusCode, Json<ApiError>)>;

fn error_response(status: StatusCode, error: impl ToString) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.to_string(),
        }),
    )
}

fn bad_request(err: ValidationError) -> (StatusCode, Json<ApiError>) {
    error_response(StatusCode::BAD_REQUEST, err)
}

/// Parse a request body as JSON, reporting garbage as a validation failure
fn parse_body(body: &Bytes) -> Result<Value, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::invalid("body", e.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Liveness and basic node info
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        node_id: state.node.node_id().to_string(),
        height: state.node.blockchain.read().await.len(),
    })
}

/// POST /transactions/new - Pool a transaction for the next block
pub async fn new_transaction(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<TransactionCreated> {
    let value = parse_body(&body).map_err(bad_request)?;
    let index = state.node.submit_json(&value).await.map_err(bad_request)?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionCreated {
            message: format!("Transaction will be added to Block {}", index),
            index,
        }),
    ))
}

/// GET /transactions/pending - Transactions waiting for the next block
pub async fn pending_transactions(State(state): State<ApiState>) -> Json<PendingResponse> {
    let transactions = state.node.pending_transactions().await;
    Json(PendingResponse {
        pending_transactions: transactions.len(),
        transactions,
    })
}

/// GET /mine - Mine a new block
pub async fn mine(State(state): State<ApiState>) -> ApiResult<MineResponse> {
    match state.node.mine().await {
        Ok(block) => Ok((StatusCode::OK, Json(MineResponse::from(block)))),
        Err(e @ MiningError::Cancelled) => Err(error_response(StatusCode::SERVICE_UNAVAILABLE, e)),
        Err(e) => {
            log::error!("Mining failed: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Mining failed: {}", e),
            ))
        }
    }
}

/// GET /chain - Full chain and its length
pub async fn full_chain(State(state): State<ApiState>) -> Json<ChainSnapshot> {
    Json(state.node.get_chain().await)
}

/// GET /chain/blocks/{index} - One block by index
pub async fn get_block(
    State(state): State<ApiState>,
    Path(index): Path<u64>,
) -> ApiResult<Block> {
    let chain = state.node.blockchain.read().await;

    match chain.get_block(index) {
        Some(block) => Ok((StatusCode::OK, Json(block.clone()))),
        None => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Block {} not found", index),
        )),
    }
}

/// GET /chain/validate - Validate the local chain
pub async fn validate_chain(State(state): State<ApiState>) -> Json<ValidationResponse> {
    let (blocks_checked, result) = state.node.validate().await;

    Json(ValidationResponse {
        valid: result.is_ok(),
        blocks_checked,
        message: match result {
            Ok(()) => format!("Blockchain is valid ({} blocks verified)", blocks_checked),
            Err(e) => format!("Blockchain validation failed: {}", e),
        },
    })
}

/// POST /nodes/register - Register peers given as `{"nodes": [...]}`
pub async fn register_nodes(State(state): State<ApiState>, body: Bytes) -> ApiResult<PeersResponse> {
    let value = parse_body(&body).map_err(bad_request)?;

    let nodes: Vec<String> = match value.get("nodes") {
        None | Some(Value::Null) => return Err(bad_request(ValidationError::EmptyPeerList)),
        Some(nodes) => serde_json::from_value(nodes.clone()).map_err(|_| {
            bad_request(ValidationError::invalid("nodes", "must be a list of strings"))
        })?,
    };

    let total_nodes = state.node.register_peers(&nodes).await.map_err(bad_request)?;

    Ok((
        StatusCode::CREATED,
        Json(PeersResponse {
            message: "New nodes have been added".to_string(),
            total_nodes,
        }),
    ))
}

/// GET /nodes - Known peers
pub async fn list_nodes(State(state): State<ApiState>) -> Json<PeersResponse> {
    let total_nodes = state.node.peers().await;
    Json(PeersResponse {
        message: format!("{} known node(s)", total_nodes.len()),
        total_nodes,
    })
}

/// GET /nodes/resolve - Adopt the longest valid chain among peers
pub async fn resolve(State(state): State<ApiState>) -> Json<ResolveResponse> {
    let resolution = state.node.resolve().await;

    Json(ResolveResponse {
        message: if resolution.replaced {
            "Our chain was replaced".to_string()
        } else {
            "Our chain is authoritative".to_string()
        },
        replaced: resolution.replaced,
        chain: resolution.chain,
    })
}
