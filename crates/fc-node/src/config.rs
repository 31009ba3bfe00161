use std::path::PathBuf;
use std::time::Duration;

use fc_sync::SyncStrategy;
use fc_transport::PeerAddress;

/// Default ingestion period: 3 hours, carried over from the ancestor
/// binary's default acquisition interval.
pub const DEFAULT_INGESTION_INTERVAL: Duration = Duration::from_secs(10_800);

/// Default sync period. Independent from the ingestion interval so a node
/// keeps pulling peer blocks even during a long gap between ingestion runs.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Full configuration for a [`crate::Node`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Host the peer transport's TLS listener binds to.
    pub listen_host: String,

    /// Port the peer transport's TLS listener binds to.
    pub listen_port: u16,

    /// This node's publicly reachable IP, used for the self-identity filter
    /// that drops `PEERS_SHARING` entries pointing back at this node. Falls
    /// back to `listen_host` when not set.
    pub public_ip: Option<String>,

    /// Seed peer dialed once at startup to bootstrap peer discovery and
    /// chain sync.
    pub bootstrap_peer: Option<PeerAddress>,

    /// PKCS#8 PEM path for this node's RSA signing identity. Generated and
    /// persisted here on first run if absent.
    pub identity_key_path: PathBuf,

    /// PEM certificate chain used for the TLS transport layer.
    pub tls_cert_path: PathBuf,

    /// PEM private key matching `tls_cert_path`.
    pub tls_key_path: PathBuf,

    /// SQLite connection string, e.g. `sqlite://factchain.db?mode=rwc`.
    pub database_url: String,

    /// Proof-of-work difficulty applied to blocks this node seals. Must
    /// match every peer's difficulty or sealed blocks will be rejected.
    pub difficulty: u32,

    /// How often the ingestion loop pulls new content.
    pub ingestion_interval: Duration,

    /// How often the sync loop reconciles against known peers.
    pub sync_interval: Duration,

    /// Port the Verification API's axum server binds to, on the same host
    /// as `listen_host`.
    pub api_port: u16,

    /// Strategy controlling which of a peer's blocks get pulled down.
    pub sync_strategy: SyncStrategy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 7700,
            public_ip: None,
            bootstrap_peer: None,
            identity_key_path: PathBuf::from("factchain_identity.pem"),
            tls_cert_path: PathBuf::from("factchain_tls_cert.pem"),
            tls_key_path: PathBuf::from("factchain_tls_key.pem"),
            database_url: "sqlite://factchain.db?mode=rwc".to_string(),
            difficulty: fc_chain::SEAL_DIFFICULTY,
            ingestion_interval: DEFAULT_INGESTION_INTERVAL,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            api_port: 7701,
            sync_strategy: SyncStrategy::default(),
        }
    }
}

impl NodeConfig {
    /// The address this node advertises to peers during the handshake and
    /// filters out of incoming `PEERS_SHARING` entries.
    pub fn self_address(&self) -> PeerAddress {
        PeerAddress {
            ip_address: self.public_ip.clone().unwrap_or_else(|| self.listen_host.clone()),
            port: self.listen_port,
        }
    }

    /// Peers only ever learn a node's `listen_port` (carried in
    /// `PeerAddress`/`PEERS_SHARING`), never its `api_port`, and derive the
    /// Verification API address as `listen_port + 1`. Enforced here at
    /// startup so a misconfigured node fails fast instead of silently
    /// breaking sync for everyone who tries to reach it.
    pub fn validate(&self) -> Result<(), crate::error::NodeError> {
        if self.api_port != self.listen_port + 1 {
            return Err(crate::error::NodeError::InvalidApiPort {
                listen_port: self.listen_port,
                api_port: self.api_port,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_valid_api_port() {
        NodeConfig::default().validate().unwrap();
    }

    #[test]
    fn mismatched_api_port_is_rejected() {
        let mut config = NodeConfig::default();
        config.api_port = config.listen_port + 2;
        assert!(config.validate().is_err());
    }
}
