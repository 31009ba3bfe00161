use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid time range: from > to")]
    InvalidTimeRange,

    #[error("chain error: {0}")]
    Chain(#[from] fc_chain::ChainError),

    #[error("store error: {0}")]
    Store(#[from] fc_store::StoreError),

    #[error("peer {0} sent a chain that does not validate: {1}")]
    InvalidPeerChain(String, String),

    #[error("peer {0} reported a longer chain but sent no blocks")]
    EmptyBlockResponse(String),
}
