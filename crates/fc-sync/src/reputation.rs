use serde::{Deserialize, Serialize};

/// Penalty applied to a peer's reputation after a failed sync attempt
/// (either the connection failed or the peer's chain did not validate).
pub const REP_PENALTY: f64 = 0.2;

/// Small reward for a peer that answered and was already up to date.
/// Keeps long-lived, quiet peers from decaying relative to noisy ones.
pub const REP_REWARD_UPTIME: f64 = 0.0001;

/// Reward per new block a peer honestly supplied, on top of the uptime
/// reward for that sync attempt.
pub const REP_REWARD_SEALED_BLOCK: f64 = 0.0075;

/// The bucket a sync attempt with a peer fell into, used only to drive the
/// reputation update — network-level and validation-level failures are not
/// otherwise distinguished here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAttempt {
    UpToDate,
    NewBlocks(usize),
    SyncError,
    ConnectionFailed,
}

/// A peer's standing in `[0.0, 1.0]`, built up over many sync attempts.
/// Peers that consistently supply valid blocks climb; peers that fail to
/// connect or supply a chain that does not validate are pushed down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeerReputation(f64);

impl Default for PeerReputation {
    /// New peers start at a low but non-zero reputation, the same starting
    /// point a freshly discovered peer is given before any sync has been
    /// attempted with it.
    fn default() -> Self {
        Self(0.05)
    }
}

impl PeerReputation {
    pub fn new(score: f64) -> Self {
        Self(score.clamp(0.0, 1.0))
    }

    pub fn score(&self) -> f64 {
        self.0
    }

    /// Applies the reward or penalty for one sync attempt, clamping the
    /// result back into `[0.0, 1.0]`.
    pub fn record(&mut self, attempt: SyncAttempt) {
        let delta = match attempt {
            SyncAttempt::ConnectionFailed | SyncAttempt::SyncError => -REP_PENALTY,
            SyncAttempt::UpToDate => REP_REWARD_UPTIME,
            SyncAttempt::NewBlocks(count) => {
                REP_REWARD_UPTIME + (count as f64 * REP_REWARD_SEALED_BLOCK)
            }
        };
        self.0 = (self.0 + delta).clamp(0.0, 1.0);
    }

    /// A peer whose reputation has bottomed out has accumulated enough
    /// connection failures or invalid data that the sync loop should stop
    /// dialing it. Reputation only ever gates this local dial/drop
    /// decision — per spec it is never gossiped to other peers.
    pub fn should_drop(&self) -> bool {
        self.0 <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_peer_starts_at_low_reputation() {
        assert_eq!(PeerReputation::default().score(), 0.05);
    }

    #[test]
    fn repeated_failures_are_clamped_at_zero() {
        let mut rep = PeerReputation::default();
        for _ in 0..10 {
            rep.record(SyncAttempt::ConnectionFailed);
        }
        assert_eq!(rep.score(), 0.0);
    }

    #[test]
    fn new_blocks_reward_scales_with_count() {
        let mut a = PeerReputation::new(0.5);
        let mut b = PeerReputation::new(0.5);
        a.record(SyncAttempt::NewBlocks(1));
        b.record(SyncAttempt::NewBlocks(5));
        assert!(b.score() > a.score());
    }

    #[test]
    fn zeroed_out_reputation_should_be_dropped() {
        assert!(PeerReputation::new(0.0).should_drop());
        assert!(!PeerReputation::new(0.01).should_drop());
    }
}
