use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid chain: {0}")]
    InvalidChain(String),

    #[error("block at height {0} not found")]
    BlockNotFound(u64),

    #[error("merkle error: {0}")]
    Merkle(#[from] fc_hasher::MerkleError),
}
