use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use fc_chain::Block;
use fc_hasher::{merkle_proof, Sha256Hash};
use fc_store::Store;
use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// Shared, read-only handle the Verification API hands to every request.
/// Handlers never write through this — mutation only ever happens in the
/// ingestion and sync loops.
#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
}

pub fn router(store: Store) -> Router {
    Router::new()
        .route("/chain_height", get(chain_height))
        .route("/blocks", get(blocks_since))
        .route("/facts_by_hash", post(facts_by_hash))
        .route("/merkle_proof", get(merkle_proof_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(ApiState { store }))
}

#[derive(Serialize)]
struct ChainHeightResponse {
    height: i64,
}

async fn chain_height(State(state): State<Arc<ApiState>>) -> Result<Json<ChainHeightResponse>, ApiError> {
    let height = state.store.tip_height().await?;
    Ok(Json(ChainHeightResponse {
        height: height.map(|h| h as i64).unwrap_or(-1),
    }))
}

#[derive(Deserialize)]
struct SinceQuery {
    since: i64,
}

#[derive(Serialize)]
struct BlocksResponse {
    blocks: Vec<Block>,
}

async fn blocks_since(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<SinceQuery>,
) -> Result<Json<BlocksResponse>, ApiError> {
    let since = q.since.max(0) as u64;
    let blocks = state.store.blocks_since(since).await?;
    Ok(Json(BlocksResponse { blocks }))
}

#[derive(Deserialize)]
struct FactsByHashRequest {
    fact_hashes: Vec<String>,
}

#[derive(Serialize)]
struct FactWire {
    content: String,
    hash: String,
    score: u32,
    disputed: bool,
    last_checked: String,
    semantics: fc_store::Semantics,
    sources: Vec<String>,
}

#[derive(Serialize)]
struct FactsByHashResponse {
    facts: Vec<FactWire>,
}

async fn facts_by_hash(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<FactsByHashRequest>,
) -> Result<Json<FactsByHashResponse>, ApiError> {
    let mut facts = Vec::with_capacity(req.fact_hashes.len());
    for hash in &req.fact_hashes {
        let Some(fact) = state.store.fact_by_hash(hash).await? else {
            continue;
        };
        let sources = state.store.sources_for_fact(fact.id).await?;
        facts.push(FactWire {
            content: fact.content,
            hash: fact.hash,
            score: fact.score,
            disputed: fact.disputed,
            last_checked: fact.last_checked.to_rfc3339(),
            semantics: fact.semantics,
            sources,
        });
    }
    Ok(Json(FactsByHashResponse { facts }))
}

#[derive(Deserialize)]
struct MerkleProofQuery {
    fact_hash: String,
    block_height: u64,
}

#[derive(Serialize)]
struct ProofStep {
    sibling_hex: String,
    pos: &'static str,
}

#[derive(Serialize)]
struct MerkleProofResponse {
    merkle_root: String,
    proof: Vec<ProofStep>,
}

/// Looks up the block at `block_height`, locates `fact_hash` within its
/// sorted fact list (the order the block's Merkle root was built over), and
/// returns an inclusion proof a listener can check against the block's
/// `merkle_root` without holding any other fact in the block.
async fn merkle_proof_handler(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<MerkleProofQuery>,
) -> Result<Json<MerkleProofResponse>, ApiError> {
    let block = state
        .store
        .block_at(q.block_height)
        .await?
        .ok_or_else(|| NodeError::ProofSubjectNotFound(format!("block {}", q.block_height)))?;

    let mut sorted_facts = block.fact_hashes.clone();
    sorted_facts.sort();

    let index = sorted_facts
        .iter()
        .position(|h| h == &q.fact_hash)
        .ok_or_else(|| NodeError::ProofSubjectNotFound(q.fact_hash.clone()))?;

    let leaves: Vec<Sha256Hash> = sorted_facts
        .iter()
        .map(|h| h.parse())
        .collect::<Result<_, fc_hasher::MerkleError>>()
        .map_err(NodeError::from)?;

    let proof = merkle_proof(&leaves, index).map_err(NodeError::from)?;

    let steps = proof
        .path
        .into_iter()
        .map(|node| ProofStep {
            sibling_hex: node.hash.to_hex(),
            pos: match node.side {
                fc_hasher::ProofSide::Left => "L",
                fc_hasher::ProofSide::Right => "R",
            },
        })
        .collect();

    Ok(Json(MerkleProofResponse {
        merkle_root: block.merkle_root,
        proof: steps,
    }))
}

/// Maps a [`NodeError`] to an HTTP response: every case here is either a
/// store read failure or a not-found lookup, never a write, so `500` and
/// `404` cover the whole surface.
struct ApiError(NodeError);

impl From<fc_store::StoreError> for ApiError {
    fn from(e: fc_store::StoreError) -> Self {
        ApiError(NodeError::from(e))
    }
}

impl From<NodeError> for ApiError {
    fn from(e: NodeError) -> Self {
        ApiError(e)
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            NodeError::ProofSubjectNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}
