use serde::{Deserialize, Serialize};

use crate::{block::Block, error::ChainError};

/// The append-only chain of [`Block`]s that forms the FactChain ledger.
///
/// Invariants maintained by this type:
/// - Always contains at least the genesis block.
/// - Every block's `previous_hash` matches the hash of the preceding block.
/// - Block heights are contiguous starting from 0.
/// - Every block's stored `hash` matches its recomputed canonical hash and
///   satisfies the proof-of-work difficulty required at its height.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blockchain {
    blocks: Vec<Block>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Initialise a new chain with only the genesis block.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Reconstructs a chain from previously persisted blocks, validating the
    /// full chain before accepting it.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        let chain = Self { blocks };
        if !chain.is_valid() {
            return Err(ChainError::InvalidChain(
                "persisted blocks do not form a valid chain".into(),
            ));
        }
        Ok(chain)
    }

    /// Number of blocks in the chain (including genesis).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block.
    pub fn tip(&self) -> &Block {
        // Always at least one block (genesis) by construction.
        self.blocks.last().expect("chain always has a genesis block")
    }

    /// The current chain height (the tip's height).
    pub fn height(&self) -> u64 {
        self.tip().height
    }

    /// Builds (but does not seal) the next block on top of the current tip,
    /// committing to `fact_hashes`. Sealing is CPU-bound and left to the
    /// caller to run off the async executor.
    pub fn build_next(&self, fact_hashes: Vec<String>) -> Result<Block, ChainError> {
        Block::new(self.tip().height + 1, self.tip().hash.clone(), fact_hashes)
    }

    /// Appends an already-sealed block, validating it against the current
    /// tip first.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        Self::validate_link(self.tip(), &block)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Returns a reference to the block at `height`, if present.
    pub fn get_block(&self, height: u64) -> Option<&Block> {
        self.blocks.get(height as usize)
    }

    /// All blocks from `start_height` onward (inclusive).
    pub fn blocks_from(&self, start_height: u64) -> &[Block] {
        let pos = start_height as usize;
        if pos >= self.blocks.len() {
            &[]
        } else {
            &self.blocks[pos..]
        }
    }

    /// All blocks in the chain.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Checks that `candidate` correctly extends `prev`: contiguous height,
    /// matching `previous_hash`, internally consistent hash, and a
    /// proof-of-work seal satisfying the difficulty required at its height.
    fn validate_link(prev: &Block, candidate: &Block) -> Result<(), ChainError> {
        if candidate.height != prev.height + 1 {
            return Err(ChainError::InvalidChain(format!(
                "expected height {}, got {}",
                prev.height + 1,
                candidate.height
            )));
        }
        if candidate.previous_hash != prev.hash {
            return Err(ChainError::InvalidChain(
                "previous_hash does not match tip".into(),
            ));
        }
        if !candidate.is_properly_sealed() {
            return Err(ChainError::InvalidChain(
                "block hash is not a valid proof-of-work seal for its contents".into(),
            ));
        }
        Ok(())
    }

    /// Validate the full chain structure from genesis to tip.
    pub fn is_valid(&self) -> bool {
        if self.blocks.is_empty() {
            return false;
        }
        if !self.blocks[0].is_properly_sealed() {
            return false;
        }

        self.blocks
            .windows(2)
            .all(|w| Self::validate_link(&w[0], &w[1]).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(content: &str) -> String {
        fc_hasher::Sha256Hash::of(content.as_bytes()).to_hex()
    }

    #[test]
    fn new_chain_is_valid() {
        assert!(Blockchain::new().is_valid());
    }

    #[test]
    fn build_seal_and_append_extends_chain() {
        let mut chain = Blockchain::new();
        let mut next = chain.build_next(vec![fact("the sky is blue")]).unwrap();
        next.seal(crate::block::SEAL_DIFFICULTY);

        chain.append(next).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(chain.is_valid());
    }

    #[test]
    fn append_rejects_wrong_previous_hash() {
        let mut chain = Blockchain::new();
        let mut bogus = chain.build_next(vec![fact("x")]).unwrap();
        bogus.previous_hash = "not-the-real-tip".to_string();
        bogus.seal(crate::block::SEAL_DIFFICULTY);

        assert!(chain.append(bogus).is_err());
    }

    #[test]
    fn append_rejects_unsealed_block() {
        let mut chain = Blockchain::new();
        let unsealed = chain.build_next(vec![fact("x")]).unwrap();
        // Never called `.seal()`, so the hash almost certainly lacks the
        // required leading zeros.
        assert!(chain.append(unsealed).is_err());
    }

    #[test]
    fn blocks_from_returns_suffix() {
        let mut chain = Blockchain::new();
        for i in 0..3 {
            let mut b = chain.build_next(vec![fact(&format!("fact {i}"))]).unwrap();
            b.seal(crate::block::SEAL_DIFFICULTY);
            chain.append(b).unwrap();
        }

        assert_eq!(chain.blocks_from(2).len(), 2);
        assert_eq!(chain.blocks_from(10).len(), 0);
    }
}
