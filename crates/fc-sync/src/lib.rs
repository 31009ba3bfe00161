pub mod engine;
pub mod error;
pub mod manager;
pub mod reputation;
pub mod strategy;

pub use engine::{reconcile_with_peer, ReconcileResult, SyncOutcome};
pub use error::SyncError;
pub use manager::SyncManager;
pub use reputation::{PeerReputation, SyncAttempt, REP_PENALTY, REP_REWARD_SEALED_BLOCK, REP_REWARD_UPTIME};
pub use strategy::SyncStrategy;
