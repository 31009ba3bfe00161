use std::collections::HashMap;
use std::sync::Arc;

use fc_keystore::tls::TlsMaterial;
use fc_keystore::{NodeIdentity, PublicIdentity};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::TransportError;
use crate::framing::{encode_frame, FrameReader};
use crate::message::{Message, RawMessage};
use crate::peer::PeerAddress;
use crate::tls::{build_acceptor, build_connector};

pub type LinkId = u64;

/// Consecutive signature failures tolerated on an established link before
/// it is torn down; a peer sending unverifiable frames is broken or
/// hostile either way.
const MAX_SIGNATURE_FAILURES: u32 = 3;

trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

type BoxedStream = Box<dyn AsyncStream>;

struct LinkHandle {
    write_half: WriteHalf<BoxedStream>,
    address: Option<PeerAddress>,
}

/// An event surfaced from a peer link onto the node's single event loop.
pub enum TransportEvent {
    LinkEstablished {
        link_id: LinkId,
        peer: PeerAddress,
        public_key: PublicIdentity,
    },
    MessageReceived {
        link_id: LinkId,
        message: Message,
    },
    LinkClosed {
        link_id: LinkId,
    },
}

/// Owns every live peer connection (TLS-wrapped TCP, RSA-PSS signed frames)
/// and multiplexes their events onto one channel so the node's main loop
/// can `tokio::select!` over one receiver instead of one socket per peer.
pub struct Transport {
    identity: Arc<NodeIdentity>,
    self_address: PeerAddress,
    acceptor: tokio_rustls::TlsAcceptor,
    connector: tokio_rustls::TlsConnector,
    listener: Option<TcpListener>,
    links: HashMap<LinkId, LinkHandle>,
    next_link_id: LinkId,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl Transport {
    pub fn new(
        identity: Arc<NodeIdentity>,
        self_address: PeerAddress,
        tls_material: &TlsMaterial,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let acceptor = build_acceptor(tls_material)?;
        let connector = build_connector();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                identity,
                self_address,
                acceptor,
                connector,
                listener: None,
                links: HashMap::new(),
                next_link_id: 0,
                events_tx,
            },
            events_rx,
        ))
    }

    pub fn self_address(&self) -> &PeerAddress {
        &self.self_address
    }

    /// Binds the listening socket. Must be called before [`accept_one`].
    ///
    /// [`accept_one`]: Transport::accept_one
    pub async fn bind(&mut self, addr: &str) -> Result<std::net::SocketAddr, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(local)
    }

    /// Accepts exactly one inbound connection, TLS-wraps it, and spawns its
    /// reader task. Intended to sit inside the node's `tokio::select!` loop
    /// alongside the transport event receiver so accepting never blocks
    /// processing already-established links.
    pub async fn accept_one(&mut self) -> Result<(), TransportError> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| TransportError::MalformedFrame("transport has not been bound".into()))?;

        let (stream, addr) = listener.accept().await?;
        let tls_stream = self.acceptor.accept(stream).await?;
        let ip_hint = addr.ip().to_string();

        let link_id = self.adopt_link(Box::new(tls_stream), Some(ip_hint));
        self.declare_self(link_id).await?;
        Ok(())
    }

    /// Dials `ip:port`, completes the TLS handshake, and declares this
    /// node's identity to the new peer.
    pub async fn connect(&mut self, ip: &str, port: u16) -> Result<LinkId, TransportError> {
        let stream = TcpStream::connect((ip, port)).await?;
        let server_name = rustls::pki_types::ServerName::try_from(ip.to_string())
            .map_err(|_| TransportError::MalformedFrame(format!("invalid server name: {ip}")))?;
        let tls_stream = self.connector.connect(server_name, stream).await?;

        let link_id = self.adopt_link(Box::new(tls_stream), Some(ip.to_string()));
        self.declare_self(link_id).await?;
        Ok(link_id)
    }

    fn adopt_link(&mut self, stream: BoxedStream, ip_hint: Option<String>) -> LinkId {
        let (read_half, write_half) = tokio::io::split(stream);
        let link_id = self.next_link_id;
        self.next_link_id += 1;

        self.links.insert(
            link_id,
            LinkHandle {
                write_half,
                address: None,
            },
        );

        let events_tx = self.events_tx.clone();
        tokio::spawn(reader_loop(link_id, read_half, events_tx, ip_hint));
        link_id
    }

    /// Sends this node's public key and declared port to `link_id`,
    /// unsigned — no peer key is known yet to verify a signature against.
    async fn declare_self(&mut self, link_id: LinkId) -> Result<(), TransportError> {
        let pem = self.identity.public().to_spki_pem()?;
        self.write_raw(link_id, pem.as_bytes()).await?;
        self.write_raw(link_id, self.self_address.port.to_string().as_bytes())
            .await
    }

    async fn write_raw(&mut self, link_id: LinkId, payload: &[u8]) -> Result<(), TransportError> {
        let framed = encode_frame(payload)?;
        let handle = self
            .links
            .get_mut(&link_id)
            .ok_or(TransportError::UnknownLink(link_id))?;
        handle.write_half.write_all(&framed).await?;
        Ok(())
    }

    /// Signs `message` and sends it to a single established peer.
    pub async fn send_message(&mut self, link_id: LinkId, message: &Message) -> Result<(), TransportError> {
        let raw = RawMessage::sign(message, &self.identity)?;
        self.write_raw(link_id, &raw.to_bytes()).await
    }

    /// Signs `message` once and sends it to every currently known link.
    /// Per-link write failures are logged and otherwise ignored; the peer
    /// will be reaped once its reader task observes the closed socket.
    pub async fn broadcast(&mut self, message: &Message) -> Result<(), TransportError> {
        let raw = RawMessage::sign(message, &self.identity)?;
        let framed = encode_frame(&raw.to_bytes())?;

        let link_ids: Vec<LinkId> = self.links.keys().copied().collect();
        for link_id in link_ids {
            if let Some(handle) = self.links.get_mut(&link_id) {
                if let Err(e) = handle.write_half.write_all(&framed).await {
                    warn!(%link_id, error = %e, "failed to write to peer, will be reaped");
                }
            }
        }
        Ok(())
    }

    /// Records the address a link declared during handshake, called by the
    /// node's event loop on [`TransportEvent::LinkEstablished`].
    pub fn record_peer_address(&mut self, link_id: LinkId, peer: PeerAddress) {
        if let Some(handle) = self.links.get_mut(&link_id) {
            handle.address = Some(peer);
        }
    }

    /// Removes a link's write half, called by the node's event loop on
    /// [`TransportEvent::LinkClosed`].
    pub fn close_link(&mut self, link_id: LinkId) {
        self.links.remove(&link_id);
    }

    /// Addresses of every link that has completed its handshake, suitable
    /// for answering a `PEERS_REQUEST`.
    pub fn known_peer_addresses(&self) -> Vec<PeerAddress> {
        self.links.values().filter_map(|h| h.address.clone()).collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

enum Stage {
    AwaitingPublicKey,
    AwaitingPort { public_key: PublicIdentity },
    Established { peer: PeerAddress, public_key: PublicIdentity },
}

async fn reader_loop(
    link_id: LinkId,
    mut read_half: ReadHalf<BoxedStream>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    ip_hint: Option<String>,
) {
    let mut frame_reader = FrameReader::new();
    let mut buf = [0u8; 4096];
    let mut stage = Stage::AwaitingPublicKey;
    let mut signature_failures = 0u32;

    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(%link_id, error = %e, "read error on peer link");
                break;
            }
        };
        frame_reader.push(&buf[..n]);

        while let Some(frame) = frame_reader.next_frame() {
            match &stage {
                Stage::AwaitingPublicKey => {
                    let parsed = std::str::from_utf8(&frame)
                        .ok()
                        .and_then(|s| PublicIdentity::from_spki_pem(s).ok());
                    match parsed {
                        Some(public_key) => stage = Stage::AwaitingPort { public_key },
                        None => {
                            warn!(%link_id, "malformed public key frame, closing link");
                            let _ = events_tx.send(TransportEvent::LinkClosed { link_id });
                            return;
                        }
                    }
                }
                Stage::AwaitingPort { public_key } => {
                    let parsed = std::str::from_utf8(&frame)
                        .ok()
                        .and_then(|s| s.trim().parse::<u16>().ok());
                    match parsed {
                        Some(port) => {
                            let peer = PeerAddress {
                                ip_address: ip_hint.clone().unwrap_or_default(),
                                port,
                            };
                            let public_key = public_key.clone();
                            let _ = events_tx.send(TransportEvent::LinkEstablished {
                                link_id,
                                peer: peer.clone(),
                                public_key: public_key.clone(),
                            });
                            stage = Stage::Established { peer, public_key };
                        }
                        None => {
                            warn!(%link_id, "malformed port frame, closing link");
                            let _ = events_tx.send(TransportEvent::LinkClosed { link_id });
                            return;
                        }
                    }
                }
                Stage::Established { public_key, .. } => {
                    let decoded = RawMessage::from_bytes(&frame)
                        .and_then(|raw| raw.verify_and_decode(public_key));
                    match decoded {
                        Ok(message) => {
                            signature_failures = 0;
                            let _ = events_tx.send(TransportEvent::MessageReceived { link_id, message });
                        }
                        Err(e) => {
                            signature_failures += 1;
                            warn!(%link_id, error = %e, signature_failures, "dropping unverifiable frame");
                            if signature_failures >= MAX_SIGNATURE_FAILURES {
                                warn!(%link_id, "closing link after repeated signature failures");
                                let _ = events_tx.send(TransportEvent::LinkClosed { link_id });
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    let _ = events_tx.send(TransportEvent::LinkClosed { link_id });
}
