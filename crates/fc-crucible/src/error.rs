use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrucibleError {
    #[error("sentence analysis failed: {0}")]
    Analyzer(String),

    #[error(transparent)]
    Store(#[from] fc_store::StoreError),

    #[error(transparent)]
    Hash(#[from] fc_hasher::MerkleError),
}
