use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid semantics JSON: {0}")]
    Semantics(#[from] serde_json::Error),

    #[error("fact hash is not valid hex: {0}")]
    InvalidHash(#[from] fc_hasher::MerkleError),

    #[error("chain error: {0}")]
    Chain(#[from] fc_chain::ChainError),

    #[error("fact {0} not found")]
    FactNotFound(i64),

    #[error("source {0:?} not found")]
    SourceNotFound(String),

    #[error("unknown fact status: {0}")]
    UnknownStatus(String),

    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(String),
}
