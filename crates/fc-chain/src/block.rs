use chrono::Utc;
use fc_hasher::{merkle_root, sha256, Sha256Hash};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ChainError;

/// Proof-of-work difficulty (count of required leading hex zeros) for the
/// genesis block, which seals instantly against an empty fact list.
pub const GENESIS_DIFFICULTY: u32 = 2;

/// Proof-of-work difficulty for every block after genesis. Fixed rather
/// than adaptive: the network has no difficulty-retargeting mechanism.
pub const SEAL_DIFFICULTY: u32 = 4;

/// Sentinel `previous_hash` for the genesis block, which has no predecessor.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A single sealed block in the FactChain ledger.
///
/// Unlike the ancestor type this is modelled on, a block never embeds the
/// facts it commits to — only their hashes. Full fact bodies live in the
/// store; a block is just a header plus a Merkle-committed hash list, which
/// is what lets listener nodes hold the whole chain without holding the
/// corpus of accepted facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub previous_hash: String,
    pub timestamp: f64,
    pub nonce: u64,
    pub fact_hashes: Vec<String>,
    pub merkle_root: String,
    pub hash: String,
}

impl Block {
    /// Builds an unsealed block (`nonce = 0`, `hash` already computed at that
    /// nonce) on top of `previous_hash`. Callers must still [`seal`] it
    /// before gossiping, except for the genesis block which seals trivially.
    ///
    /// [`seal`]: Block::seal
    pub fn new(
        height: u64,
        previous_hash: String,
        fact_hashes: Vec<String>,
    ) -> Result<Self, ChainError> {
        let merkle_root = Self::compute_merkle_root(&fact_hashes)?;

        let mut block = Self {
            height,
            previous_hash,
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
            nonce: 0,
            fact_hashes,
            merkle_root,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        Ok(block)
    }

    /// The genesis block: height 0, no predecessor, no facts. Seals
    /// immediately at [`GENESIS_DIFFICULTY`], which is low enough that the
    /// nonce search never takes more than a handful of iterations.
    pub fn genesis() -> Self {
        let mut block = Self {
            height: 0,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            timestamp: 0.0,
            nonce: 0,
            fact_hashes: Vec::new(),
            merkle_root: merkle_root(&[]).to_hex(),
            hash: String::new(),
        };
        block.seal(GENESIS_DIFFICULTY);
        block
    }

    fn compute_merkle_root(fact_hashes: &[String]) -> Result<String, ChainError> {
        let mut sorted_facts = fact_hashes.to_vec();
        sorted_facts.sort();

        let leaves: Vec<Sha256Hash> = sorted_facts
            .iter()
            .map(|h| h.parse())
            .collect::<Result<_, _>>()?;
        Ok(merkle_root(&leaves).to_hex())
    }

    /// The canonical hash of this block's header: a JSON object with
    /// lexicographically sorted keys and a lexicographically sorted copy of
    /// `fact_hashes` (so two blocks with the same facts in different
    /// insertion order hash identically), SHA-256'd and hex-encoded.
    pub fn calculate_hash(&self) -> String {
        let mut sorted_facts = self.fact_hashes.clone();
        sorted_facts.sort();

        let payload = json!({
            "fact_hashes": sorted_facts,
            "height": self.height,
            "nonce": self.nonce,
            "previous_hash": self.previous_hash,
            "timestamp": self.timestamp,
        });

        hex::encode(sha256(payload.to_string().as_bytes()))
    }

    /// Increments `nonce` until [`calculate_hash`] produces `difficulty`
    /// leading hex zeros, then commits that hash to `self.hash`.
    ///
    /// [`calculate_hash`]: Block::calculate_hash
    pub fn seal(&mut self, difficulty: u32) {
        let prefix = "0".repeat(difficulty as usize);
        loop {
            let candidate = self.calculate_hash();
            if candidate.starts_with(&prefix) {
                self.hash = candidate;
                return;
            }
            self.nonce += 1;
        }
    }

    /// The difficulty a block at this height must satisfy.
    pub fn required_difficulty(height: u64) -> u32 {
        if height == 0 {
            GENESIS_DIFFICULTY
        } else {
            SEAL_DIFFICULTY
        }
    }

    /// `true` if `self.hash` both matches [`calculate_hash`] and satisfies
    /// the proof-of-work difficulty required at this height.
    ///
    /// [`calculate_hash`]: Block::calculate_hash
    pub fn is_properly_sealed(&self) -> bool {
        let prefix = "0".repeat(Self::required_difficulty(self.height) as usize);
        self.hash == self.calculate_hash() && self.hash.starts_with(&prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_no_facts_and_seals_at_low_difficulty() {
        let genesis = Block::genesis();
        assert_eq!(genesis.height, 0);
        assert!(genesis.fact_hashes.is_empty());
        assert!(genesis.hash.starts_with("00"));
        assert!(genesis.is_properly_sealed());
    }

    #[test]
    fn seal_finds_a_nonce_satisfying_difficulty() {
        let fact = Sha256Hash::of(b"water boils at 100 celsius").to_hex();
        let mut block = Block::new(1, Block::genesis().hash, vec![fact]).unwrap();
        block.seal(2);

        assert!(block.hash.starts_with("00"));
        assert!(block.is_properly_sealed());
    }

    #[test]
    fn hash_is_order_independent_in_fact_hashes() {
        let a = Sha256Hash::of(b"fact a").to_hex();
        let b = Sha256Hash::of(b"fact b").to_hex();

        let first = Block::new(1, Block::genesis().hash.clone(), vec![a.clone(), b.clone()]).unwrap();
        let second = Block::new(1, Block::genesis().hash, vec![b, a]).unwrap();

        assert_eq!(first.calculate_hash(), second.calculate_hash());
    }

    #[test]
    fn merkle_root_is_order_independent_in_fact_hashes() {
        let a = Sha256Hash::of(b"fact a").to_hex();
        let b = Sha256Hash::of(b"fact b").to_hex();

        let first = Block::new(1, Block::genesis().hash.clone(), vec![a.clone(), b.clone()]).unwrap();
        let second = Block::new(1, Block::genesis().hash, vec![b, a]).unwrap();

        assert_eq!(first.merkle_root, second.merkle_root);
    }

    #[test]
    fn tampering_with_nonce_breaks_seal() {
        let mut block = Block::new(1, Block::genesis().hash, vec![]).unwrap();
        block.seal(2);
        block.nonce += 1;
        assert!(!block.is_properly_sealed());
    }
}
