use serde::{Deserialize, Serialize};

/// Controls which blocks a node will pull from its peers once it falls
/// behind, trading completeness for bandwidth and storage on nodes that
/// cannot or do not want to hold the entire ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStrategy {
    /// Sync only blocks sealed within the given Unix-timestamp window
    /// (inclusive on both ends).
    TimeRange { from: i64, to: i64 },

    /// Stop syncing once the estimated on-disk size of downloaded blocks
    /// exceeds `max_bytes`.
    SizeLimit { max_bytes: u64 },

    /// Pull every block the peer reports beyond the local tip. The default:
    /// a full node holding the whole ledger has nothing to gain from
    /// withholding blocks from itself.
    OnDemand,
}

impl Default for SyncStrategy {
    fn default() -> Self {
        Self::OnDemand
    }
}
