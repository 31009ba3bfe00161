use std::collections::HashSet;

use fc_chain::{Block, Blockchain};
use fc_store::Store;
use tracing::{info, warn};

use crate::SyncError;

/// The result of reconciling the local chain against one peer's reported
/// blocks, mirroring the three outcomes a sync attempt can end in once the
/// connection itself has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The peer's height did not exceed the local tip; nothing to do.
    UpToDate,
    /// `count` new blocks were validated and appended.
    NewBlocks(usize),
}

/// Everything a caller needs to finish a sync round: the outcome, and any
/// fact content the newly appended blocks reference that the local store
/// does not hold yet and must fetch separately from the peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileResult {
    pub outcome_new_block_count: usize,
    pub missing_fact_hashes: Vec<String>,
}

/// Reconciles the local chain against a peer's reported height and blocks.
///
/// This is the validating half of a sync attempt: the caller is
/// responsible for actually fetching `peer_blocks` from the peer (over
/// `fc-transport`) before calling this, and for fetching
/// `missing_fact_hashes` afterward. Every block is validated with the same
/// rule the local chain enforces on itself — contiguous height, correct
/// `previous_hash`, and a genuine proof-of-work seal — so a peer cannot
/// get a forged or incomplete chain accepted just by answering the sync
/// request.
pub async fn reconcile_with_peer(
    store: &Store,
    chain: &mut Blockchain,
    peer_label: &str,
    peer_height: u64,
    peer_blocks: Vec<Block>,
) -> Result<ReconcileResult, SyncError> {
    if peer_height <= chain.height() {
        info!(peer = peer_label, "local chain is up to date");
        return Ok(ReconcileResult::default());
    }

    if peer_blocks.is_empty() {
        warn!(peer = peer_label, "peer reported a longer chain but sent no blocks");
        return Err(SyncError::EmptyBlockResponse(peer_label.to_string()));
    }

    // Validate the whole batch against a scratch copy of the chain before
    // touching the real chain or the store, so a bad block anywhere in the
    // batch leaves both untouched rather than partially applied.
    let mut staged = chain.clone();
    for block in &peer_blocks {
        staged.append(block.clone()).map_err(|e| {
            SyncError::InvalidPeerChain(peer_label.to_string(), e.to_string())
        })?;
    }

    let mut all_fact_hashes: HashSet<String> = HashSet::new();
    let mut applied = 0usize;

    for block in peer_blocks {
        all_fact_hashes.extend(block.fact_hashes.iter().cloned());

        chain
            .append(block.clone())
            .expect("block already validated against a scratch copy of this chain");
        store.append_block(&block).await?;
        applied += 1;
    }

    let mut missing = Vec::new();
    for hash in all_fact_hashes {
        if store.fact_by_hash(&hash).await?.is_none() {
            missing.push(hash);
        }
    }

    info!(peer = peer_label, applied, missing = missing.len(), "synced new blocks");

    Ok(ReconcileResult {
        outcome_new_block_count: applied,
        missing_fact_hashes: missing,
    })
}

impl ReconcileResult {
    pub fn outcome(&self) -> SyncOutcome {
        if self.outcome_new_block_count == 0 {
            SyncOutcome::UpToDate
        } else {
            SyncOutcome::NewBlocks(self.outcome_new_block_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(content: &str) -> String {
        fc_hasher::Sha256Hash::of(content.as_bytes()).to_hex()
    }

    #[tokio::test]
    async fn up_to_date_peer_applies_nothing() {
        let store = Store::connect_in_memory().await.unwrap();
        let mut chain = Blockchain::new();
        store.append_block(chain.tip()).await.unwrap();

        let result = reconcile_with_peer(&store, &mut chain, "peer-a", 0, vec![])
            .await
            .unwrap();
        assert_eq!(result.outcome(), SyncOutcome::UpToDate);
    }

    #[tokio::test]
    async fn valid_new_block_is_applied_and_missing_facts_reported() {
        let store = Store::connect_in_memory().await.unwrap();
        let mut chain = Blockchain::new();
        store.append_block(chain.tip()).await.unwrap();

        let fact_hash = fact("the moon has no atmosphere");
        let mut next = chain.build_next(vec![fact_hash.clone()]).unwrap();
        next.seal(fc_chain::SEAL_DIFFICULTY);

        let result = reconcile_with_peer(&store, &mut chain, "peer-a", 1, vec![next])
            .await
            .unwrap();

        assert_eq!(result.outcome(), SyncOutcome::NewBlocks(1));
        assert_eq!(result.missing_fact_hashes, vec![fact_hash]);
        assert_eq!(chain.height(), 1);
    }

    #[tokio::test]
    async fn tampered_block_is_rejected_and_chain_is_unchanged() {
        let store = Store::connect_in_memory().await.unwrap();
        let mut chain = Blockchain::new();
        store.append_block(chain.tip()).await.unwrap();

        let mut bogus = chain.build_next(vec![fact("bogus")]).unwrap();
        bogus.seal(fc_chain::SEAL_DIFFICULTY);
        bogus.previous_hash = "not-the-real-tip".to_string();

        let result = reconcile_with_peer(&store, &mut chain, "peer-b", 1, vec![bogus]).await;
        assert!(result.is_err());
        assert_eq!(chain.height(), 0);
    }

    #[tokio::test]
    async fn a_bad_block_later_in_a_batch_discards_the_whole_batch() {
        let store = Store::connect_in_memory().await.unwrap();
        let mut chain = Blockchain::new();
        store.append_block(chain.tip()).await.unwrap();

        let mut good = chain.build_next(vec![fact("the tide comes in twice a day")]).unwrap();
        good.seal(fc_chain::SEAL_DIFFICULTY);

        let mut bad = good.clone();
        bad.height += 1;
        bad.previous_hash = "not-the-real-second-block".to_string();
        bad.fact_hashes = vec![fact("bogus")];
        bad.seal(fc_chain::SEAL_DIFFICULTY);

        let result = reconcile_with_peer(&store, &mut chain, "peer-d", 2, vec![good, bad]).await;
        assert!(result.is_err());

        // Neither block was applied: the in-memory chain is untouched and
        // nothing beyond genesis was persisted.
        assert_eq!(chain.height(), 0);
        assert_eq!(store.tip_height().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn empty_block_list_for_a_taller_peer_is_an_error() {
        let store = Store::connect_in_memory().await.unwrap();
        let mut chain = Blockchain::new();
        store.append_block(chain.tip()).await.unwrap();

        let result = reconcile_with_peer(&store, &mut chain, "peer-c", 5, vec![]).await;
        assert!(matches!(result, Err(SyncError::EmptyBlockResponse(_))));
    }
}
