use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] fc_store::StoreError),

    #[error("chain error: {0}")]
    Chain(#[from] fc_chain::ChainError),

    #[error("crucible error: {0}")]
    Crucible(#[from] fc_crucible::CrucibleError),

    #[error("transport error: {0}")]
    Transport(#[from] fc_transport::TransportError),

    #[error("sync error: {0}")]
    Sync(#[from] fc_sync::SyncError),

    #[error("keystore error: {0}")]
    Keystore(#[from] fc_keystore::KeystoreError),

    #[error("merkle error: {0}")]
    Merkle(#[from] fc_hasher::MerkleError),

    #[error("peer request failed: {0}")]
    PeerRequest(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer {0} returned a malformed response: {1}")]
    MalformedPeerResponse(String, String),

    #[error("no such fact or block for merkle proof: {0}")]
    ProofSubjectNotFound(String),

    #[error("invalid config: api_port ({api_port}) must be listen_port ({listen_port}) + 1, \
             since peers are only ever told a node's listen_port and derive its api_port from it")]
    InvalidApiPort { listen_port: u16, api_port: u16 },
}
