use thiserror::Error;

#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid hex digest: {0}")]
    InvalidHex(String),
}
