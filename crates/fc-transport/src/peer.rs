use serde::{Deserialize, Serialize};

/// A peer's network address, as declared during the handshake or shared by
/// another peer via `PEERS_SHARING`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    pub ip_address: String,
    pub port: u16,
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip_address, self.port)
    }
}

/// A peer known well enough to be worth sharing with others: it has
/// declared both a reachable address and a public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedPeer {
    pub ip_address: String,
    pub port: u16,
}

impl From<PeerAddress> for SerializedPeer {
    fn from(addr: PeerAddress) -> Self {
        Self {
            ip_address: addr.ip_address,
            port: addr.port,
        }
    }
}

impl From<SerializedPeer> for PeerAddress {
    fn from(peer: SerializedPeer) -> Self {
        Self {
            ip_address: peer.ip_address,
            port: peer.port,
        }
    }
}
