use fc_chain::{Block, Blockchain};

use crate::{SyncError, SyncStrategy};

/// Applies a [`SyncStrategy`] to decide which of a peer's blocks should
/// actually be pulled down and applied locally.
pub struct SyncManager {
    strategy: SyncStrategy,
    /// Estimated bytes of block data already downloaded in this session.
    downloaded_bytes: u64,
}

impl SyncManager {
    pub fn new(strategy: SyncStrategy) -> Self {
        Self {
            strategy,
            downloaded_bytes: 0,
        }
    }

    pub fn strategy(&self) -> &SyncStrategy {
        &self.strategy
    }

    pub fn set_strategy(&mut self, strategy: SyncStrategy) {
        self.strategy = strategy;
        self.downloaded_bytes = 0;
    }

    /// Given a peer's reported blocks, return the slice that should be
    /// requested and applied locally according to the active strategy.
    ///
    /// `local` is used only to determine the starting point: blocks the
    /// local chain already has are never considered, regardless of
    /// strategy.
    pub fn blocks_to_sync<'a>(
        &mut self,
        local: &Blockchain,
        remote_blocks: &'a [Block],
    ) -> Result<Vec<&'a Block>, SyncError> {
        let local_height = local.height();

        let new_blocks: Vec<&Block> = remote_blocks
            .iter()
            .filter(|b| b.height > local_height)
            .collect();

        match &self.strategy {
            SyncStrategy::OnDemand => Ok(new_blocks),

            SyncStrategy::TimeRange { from, to } => {
                if from > to {
                    return Err(SyncError::InvalidTimeRange);
                }
                Ok(new_blocks
                    .into_iter()
                    .filter(|b| b.timestamp >= *from as f64 && b.timestamp <= *to as f64)
                    .collect())
            }

            SyncStrategy::SizeLimit { max_bytes } => {
                let mut selected = Vec::new();
                for block in new_blocks {
                    let estimated = estimated_block_size(block);
                    if self.downloaded_bytes + estimated > *max_bytes {
                        break;
                    }
                    self.downloaded_bytes += estimated;
                    selected.push(block);
                }
                Ok(selected)
            }
        }
    }

    /// Records that a specific block has been downloaded, for callers that
    /// fetch blocks on demand outside [`blocks_to_sync`].
    ///
    /// [`blocks_to_sync`]: Self::blocks_to_sync
    pub fn record_download(&mut self, block: &Block) {
        self.downloaded_bytes += estimated_block_size(block);
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes
    }
}

/// Rough byte estimate for a block: its fact hashes (64 hex chars each)
/// plus a fixed header overhead for the remaining header fields.
fn estimated_block_size(block: &Block) -> u64 {
    let hash_bytes: usize = block.fact_hashes.iter().map(|h| h.len()).sum();
    (hash_bytes + 256) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(content: &str) -> String {
        fc_hasher::Sha256Hash::of(content.as_bytes()).to_hex()
    }

    fn make_chain_with_blocks(count: usize) -> Blockchain {
        let mut chain = Blockchain::new();
        for i in 0..count {
            let mut block = chain.build_next(vec![fact(&format!("block {i}"))]).unwrap();
            block.seal(fc_chain::SEAL_DIFFICULTY);
            chain.append(block).unwrap();
        }
        chain
    }

    #[test]
    fn on_demand_returns_every_new_block() {
        let local = Blockchain::new();
        let remote = make_chain_with_blocks(3);
        let mut mgr = SyncManager::new(SyncStrategy::OnDemand);
        let result = mgr.blocks_to_sync(&local, remote.blocks()).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn size_limit_caps_downloaded_blocks() {
        let local = Blockchain::new();
        let remote = make_chain_with_blocks(10);

        let mut mgr = SyncManager::new(SyncStrategy::SizeLimit { max_bytes: 600 });
        let blocks = mgr.blocks_to_sync(&local, remote.blocks()).unwrap();
        assert!(blocks.len() <= 2);
    }

    #[test]
    fn time_range_filters_by_timestamp() {
        let local = Blockchain::new();
        let remote = make_chain_with_blocks(3);

        let mut mgr = SyncManager::new(SyncStrategy::TimeRange {
            from: i64::MAX - 1,
            to: i64::MAX,
        });
        let blocks = mgr.blocks_to_sync(&local, remote.blocks()).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn invalid_time_range_returns_error() {
        let local = Blockchain::new();
        let remote = make_chain_with_blocks(1);
        let mut mgr = SyncManager::new(SyncStrategy::TimeRange { from: 100, to: 50 });
        assert!(mgr.blocks_to_sync(&local, remote.blocks()).is_err());
    }

    #[test]
    fn already_held_blocks_are_excluded() {
        let local = make_chain_with_blocks(2);
        let remote = make_chain_with_blocks(2);
        let mut mgr = SyncManager::new(SyncStrategy::OnDemand);
        // Heights 1 and 2 already held locally (remote rebuilt its own chain
        // from genesis so the hashes differ, but this only exercises the
        // height cutoff, which is all blocks_to_sync looks at).
        let result = mgr.blocks_to_sync(&local, remote.blocks()).unwrap();
        assert!(result.is_empty());
    }
}
