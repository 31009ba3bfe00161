use serde::{Deserialize, Serialize};

use crate::digest::{sha256, Sha256Hash};

/// Indicates which side the sibling hash sits on when re-computing a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofSide {
    Left,
    Right,
}

/// A single step in a Merkle inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    pub hash: Sha256Hash,
    pub side: ProofSide,
}

/// An inclusion proof for a single leaf, sufficient for a listener node to
/// confirm a fact hash is a member of a sealed block without holding the
/// rest of the block's fact hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The hash of the leaf being proved.
    pub leaf_hash: Sha256Hash,
    /// Ordered list of sibling hashes from leaf to root.
    pub path: Vec<ProofNode>,
}

/// Returns `true` if following `proof`'s path from `leaf` reproduces `root`.
pub fn verify_proof(leaf: &Sha256Hash, proof: &MerkleProof, root: &Sha256Hash) -> bool {
    if proof.leaf_hash != *leaf {
        return false;
    }

    let mut current = *leaf;
    for node in &proof.path {
        let combined: [u8; 32] = match node.side {
            ProofSide::Left => {
                let mut v = node.hash.as_bytes().to_vec();
                v.extend_from_slice(current.as_bytes());
                sha256(&v)
            }
            ProofSide::Right => {
                let mut v = current.as_bytes().to_vec();
                v.extend_from_slice(node.hash.as_bytes());
                sha256(&v)
            }
        };
        current = Sha256Hash(combined);
    }

    current == *root
}

impl MerkleProof {
    /// Convenience wrapper around [`verify_proof`] for callers already
    /// holding a constructed proof and an expected root.
    pub fn verify(&self, root: &Sha256Hash) -> bool {
        verify_proof(&self.leaf_hash, self, root)
    }
}
