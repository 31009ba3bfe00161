pub mod digest;
pub mod error;
pub mod proof;
pub mod tree;

pub use digest::{sha256, Sha256Hash};
pub use error::MerkleError;
pub use proof::{verify_proof, MerkleProof, ProofNode, ProofSide};
pub use tree::{merkle_proof, merkle_root};
