use crate::{
    digest::{sha256, Sha256Hash},
    error::MerkleError,
    proof::{MerkleProof, ProofNode, ProofSide},
};

fn hash_pair(left: &Sha256Hash, right: &Sha256Hash) -> Sha256Hash {
    let mut v = left.as_bytes().to_vec();
    v.extend_from_slice(right.as_bytes());
    Sha256Hash(sha256(&v))
}

/// Builds every level of the tree, `levels[0]` = leaves (odd levels padded by
/// duplicating the last hash), `levels[last]` = a single root hash.
fn build_levels(leaves: &[Sha256Hash]) -> Vec<Vec<Sha256Hash>> {
    let mut level = leaves.to_vec();
    let mut levels = vec![level.clone()];

    while level.len() > 1 {
        if level.len() % 2 != 0 {
            let last = *level.last().unwrap();
            level.push(last);
        }

        let parent: Vec<Sha256Hash> = level.chunks(2).map(|c| hash_pair(&c[0], &c[1])).collect();
        levels.push(parent.clone());
        level = parent;
    }

    levels
}

/// The Merkle root of `leaves`. An empty fact-hash list (the genesis block)
/// roots to `sha256(b"")` rather than erroring, since a block with zero
/// facts is a valid block.
pub fn merkle_root(leaves: &[Sha256Hash]) -> Sha256Hash {
    if leaves.is_empty() {
        return Sha256Hash(sha256(b""));
    }

    let levels = build_levels(leaves);
    *levels.last().and_then(|l| l.first()).unwrap()
}

/// Builds an inclusion proof for the leaf at `index`.
pub fn merkle_proof(leaves: &[Sha256Hash], index: usize) -> Result<MerkleProof, MerkleError> {
    if index >= leaves.len() {
        return Err(MerkleError::IndexOutOfRange {
            index,
            len: leaves.len(),
        });
    }

    let levels = build_levels(leaves);
    let leaf_hash = leaves[index];
    let mut path = Vec::new();
    let mut idx = index;

    for level in &levels[..levels.len() - 1] {
        let mut padded = level.clone();
        if padded.len() % 2 != 0 {
            let last = *padded.last().unwrap();
            padded.push(last);
        }

        let sibling_index = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
        let side = if idx % 2 == 0 {
            ProofSide::Right
        } else {
            ProofSide::Left
        };

        path.push(ProofNode {
            hash: padded[sibling_index],
            side,
        });

        idx /= 2;
    }

    Ok(MerkleProof { leaf_hash, path })
}
