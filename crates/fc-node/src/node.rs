use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use fc_chain::{Block, Blockchain};
use fc_crucible::{FactPipeline, HeuristicAnalyzer};
use fc_keystore::tls::TlsMaterial;
use fc_keystore::NodeIdentity;
use fc_store::{Semantics, Store};
use fc_sync::{reconcile_with_peer, PeerReputation, SyncAttempt, SyncManager};
use fc_transport::{LinkId, Message, PeerAddress, Transport, TransportEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::content::{ContentSource, NoopContentSource};
use crate::error::NodeError;

/// Ties the transport, chain, store, crucible pipeline, and sync engine
/// together into the node's single event loop. All chain mutation and peer
/// bookkeeping happens on this one task; the Verification API (spawned
/// separately) only ever reads the store.
pub struct Node {
    config: NodeConfig,
    store: Store,
    chain: Blockchain,
    transport: Transport,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    pipeline: FactPipeline,
    sync_manager: SyncManager,
    http: reqwest::Client,
    content_source: Arc<dyn ContentSource>,
    known_peers: HashMap<PeerAddress, PeerReputation>,
    sync_notify: Arc<Notify>,
}

impl Node {
    /// Opens the store, loads or generates the node's RSA identity, binds
    /// the TLS peer-transport listener, and replays (or seeds) the local
    /// chain from the store.
    pub async fn new(config: NodeConfig, content_source: Arc<dyn ContentSource>) -> Result<Self, NodeError> {
        config.validate()?;
        let identity = Arc::new(load_or_generate_identity(&config.identity_key_path).await?);
        let tls_material = TlsMaterial::from_files(&config.tls_cert_path, &config.tls_key_path)?;

        let (mut transport, transport_events) =
            Transport::new(Arc::clone(&identity), config.self_address(), &tls_material)?;
        transport.bind(&format!("{}:{}", config.listen_host, config.listen_port)).await?;

        let store = Store::connect(&config.database_url).await?;
        let chain = load_or_seed_chain(&store).await?;
        let pipeline = FactPipeline::new(store.clone(), Arc::new(HeuristicAnalyzer));
        let sync_manager = SyncManager::new(config.sync_strategy.clone());

        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(3))
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .map_err(NodeError::PeerRequest)?;

        let mut node = Self {
            config,
            store,
            chain,
            transport,
            transport_events,
            pipeline,
            sync_manager,
            http,
            content_source,
            known_peers: HashMap::new(),
            sync_notify: Arc::new(Notify::new()),
        };

        node.dial_bootstrap_peer().await?;
        Ok(node)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn chain_height(&self) -> u64 {
        self.chain.height()
    }

    async fn dial_bootstrap_peer(&mut self) -> Result<(), NodeError> {
        let Some(peer) = self.config.bootstrap_peer.clone() else {
            return Ok(());
        };

        let link_id = self.transport.connect(&peer.ip_address, peer.port).await?;
        self.transport.send_message(link_id, &Message::PeersRequest).await?;
        self.known_peers.insert(peer, PeerReputation::default());
        Ok(())
    }

    /// Library-level content feed, used in lieu of a real acquirer: runs
    /// `text` through the extraction pipeline and, if anything new was
    /// accepted, seals it into a block and kicks the sync loop early.
    pub async fn ingest_text(
        &mut self,
        text: &str,
        source_domain: &str,
    ) -> Result<fc_crucible::IngestOutcome, NodeError> {
        let outcome = self.pipeline.ingest_text(text, source_domain).await?;
        if !outcome.accepted.is_empty() {
            let hashes = outcome.accepted.iter().map(|f| f.hash.clone()).collect();
            self.seal_and_append(hashes).await?;
            self.sync_notify.notify_one();
        }
        Ok(outcome)
    }

    /// Runs the node until `shutdown` is cancelled: the transport acceptor,
    /// the transport event handler, the ingestion loop, and the sync loop
    /// all live as arms of one `tokio::select!`, so each is cancellable at
    /// its own suspension point without tearing down the others early. The
    /// Verification API is spawned as an independent task since axum's
    /// serve future owns the listening socket for its own lifetime.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), NodeError> {
        let api_listener =
            tokio::net::TcpListener::bind(format!("{}:{}", self.config.listen_host, self.config.api_port)).await?;
        let api_router = crate::api::router(self.store.clone());
        let api_shutdown = shutdown.clone();
        let api_handle = tokio::spawn(async move {
            axum::serve(api_listener, api_router)
                .with_graceful_shutdown(async move { api_shutdown.cancelled().await })
                .await
        });

        let mut ingestion_ticker = interval(self.config.ingestion_interval);
        ingestion_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sync_ticker = interval(self.config.sync_interval);
        sync_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                accepted = self.transport.accept_one() => {
                    if let Err(e) = accepted {
                        warn!(error = %e, "failed to accept peer connection");
                    }
                }

                Some(event) = self.transport_events.recv() => {
                    self.handle_transport_event(event).await;
                }

                _ = ingestion_ticker.tick() => {
                    if let Err(e) = self.ingestion_tick().await {
                        warn!(error = %e, "ingestion tick failed");
                    }
                }

                _ = sync_ticker.tick() => {
                    self.sync_tick().await;
                }

                _ = self.sync_notify.notified() => {
                    self.sync_tick().await;
                }
            }
        }

        let _ = api_handle.await;
        Ok(())
    }

    async fn ingestion_tick(&mut self) -> Result<(), NodeError> {
        let items = self.content_source.poll().await;
        let mut accepted_hashes = Vec::new();
        let mut corroborations = 0;
        let mut contradictions = 0;

        for item in items {
            let outcome = self.pipeline.ingest_text(&item.text, &item.source_domain).await?;
            accepted_hashes.extend(outcome.accepted.iter().map(|f| f.hash.clone()));
            corroborations += outcome.corroborations;
            contradictions += outcome.contradictions;
        }

        if accepted_hashes.is_empty() {
            debug!(corroborations, contradictions, "ingestion tick produced no new facts");
            return Ok(());
        }

        info!(new_facts = accepted_hashes.len(), corroborations, contradictions, "ingestion tick accepted facts");
        self.seal_and_append(accepted_hashes).await?;
        self.sync_notify.notify_one();
        Ok(())
    }

    /// Builds the next block on a dedicated blocking worker (proof-of-work
    /// sealing is CPU-bound and must not starve the transport/ingestion
    /// loop's async I/O) and appends it to both the in-memory chain and the
    /// store.
    async fn seal_and_append(&mut self, fact_hashes: Vec<String>) -> Result<(), NodeError> {
        let mut block = self.chain.build_next(fact_hashes)?;
        let difficulty = Block::required_difficulty(block.height).max(self.config.difficulty);

        block = tokio::task::spawn_blocking(move || {
            block.seal(difficulty);
            block
        })
        .await
        .expect("block-sealing worker panicked");

        self.chain.append(block.clone())?;
        self.store.append_block(&block).await?;
        info!(height = block.height, hash = %block.hash, "sealed new block");
        Ok(())
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::LinkEstablished { link_id, peer, .. } => {
                self.transport.record_peer_address(link_id, peer.clone());
                self.known_peers.entry(peer).or_insert_with(PeerReputation::default);
            }

            TransportEvent::MessageReceived { link_id, message } => {
                self.handle_message(link_id, message).await;
            }

            TransportEvent::LinkClosed { link_id } => {
                self.transport.close_link(link_id);
            }
        }
    }

    async fn handle_message(&mut self, link_id: LinkId, message: Message) {
        match message {
            Message::PeersRequest => {
                let peers = self.transport.known_peer_addresses().into_iter().map(Into::into).collect();
                if let Err(e) = self.transport.send_message(link_id, &Message::PeersSharing { peers }).await {
                    warn!(error = %e, "failed to answer PEERS_REQUEST");
                }
            }

            Message::PeersSharing { peers } => {
                let self_address = self.config.self_address();
                for shared in peers {
                    let candidate: PeerAddress = shared.into();
                    if candidate == self_address || self.known_peers.contains_key(&candidate) {
                        continue;
                    }
                    match self.transport.connect(&candidate.ip_address, candidate.port).await {
                        Ok(_) => {
                            self.known_peers.insert(candidate, PeerReputation::default());
                        }
                        Err(e) => {
                            debug!(peer = %candidate, error = %e, "failed to dial shared peer");
                        }
                    }
                }
            }

            Message::Application { data } => {
                debug!(bytes = data.len(), "received opaque application message");
            }
        }
    }

    async fn sync_tick(&mut self) {
        let peers: Vec<PeerAddress> = self.known_peers.keys().cloned().collect();
        for peer in peers {
            if let Err(e) = self.sync_with_peer(&peer).await {
                warn!(peer = %peer, error = %e, "sync round with peer failed");
            }
        }
        self.known_peers.retain(|_, rep| !rep.should_drop());
    }

    async fn sync_with_peer(&mut self, peer: &PeerAddress) -> Result<(), NodeError> {
        let base = peer_api_base(peer);

        let height_resp = match self.http.get(format!("{base}/chain_height")).send().await {
            Ok(resp) => match resp.json::<ChainHeightResponse>().await {
                Ok(body) => body,
                Err(e) => {
                    self.penalize(peer, SyncAttempt::ConnectionFailed);
                    return Err(e.into());
                }
            },
            Err(e) => {
                self.penalize(peer, SyncAttempt::ConnectionFailed);
                return Err(e.into());
            }
        };

        if height_resp.height < 0 {
            return Ok(());
        }
        let peer_height = height_resp.height as u64;
        let local_height = self.chain.height();

        if peer_height <= local_height {
            self.penalize(peer, SyncAttempt::UpToDate);
            return Ok(());
        }

        let blocks_resp: BlocksResponse = self
            .http
            .get(format!("{base}/blocks"))
            .query(&[("since", local_height)])
            .send()
            .await?
            .json()
            .await?;

        let remote_blocks: Vec<Block> = blocks_resp.blocks.into_iter().filter(|b| b.height > local_height).collect();

        let selected = {
            let chosen = self
                .sync_manager
                .blocks_to_sync(&self.chain, &remote_blocks)
                .map_err(NodeError::from)?;
            contiguous_prefix(&chosen, local_height)
        };

        if selected.is_empty() {
            self.penalize(peer, SyncAttempt::UpToDate);
            return Ok(());
        }

        let peer_label = peer.to_string();
        let result = match reconcile_with_peer(&self.store, &mut self.chain, &peer_label, peer_height, selected).await
        {
            Ok(r) => r,
            Err(e) => {
                self.penalize(peer, SyncAttempt::SyncError);
                return Err(e.into());
            }
        };

        if !result.missing_fact_hashes.is_empty() {
            if let Err(e) = self.fetch_missing_facts(&base, &result.missing_fact_hashes).await {
                self.penalize(peer, SyncAttempt::SyncError);
                return Err(e);
            }
        }

        self.penalize(peer, SyncAttempt::NewBlocks(result.outcome_new_block_count));
        Ok(())
    }

    fn penalize(&mut self, peer: &PeerAddress, attempt: SyncAttempt) {
        self.known_peers.entry(peer.clone()).or_insert_with(PeerReputation::default).record(attempt);
    }

    /// Fetches fact bodies for `hashes` from `base` and persists them, only
    /// after every returned fact's declared hash has been independently
    /// recomputed from its content: one mismatch aborts the whole batch
    /// rather than persisting a partially-verified set.
    async fn fetch_missing_facts(&self, base: &str, hashes: &[String]) -> Result<(), NodeError> {
        let request = FactsByHashRequest {
            fact_hashes: hashes.to_vec(),
        };
        let response: FactsByHashResponse = self
            .http
            .post(format!("{base}/facts_by_hash"))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        for fact in &response.facts {
            let recomputed = fc_hasher::Sha256Hash::of(fact.content.as_bytes()).to_hex();
            if recomputed != fact.hash {
                return Err(NodeError::MalformedPeerResponse(
                    base.to_string(),
                    format!("fact hash mismatch for {}", fact.hash),
                ));
            }
        }

        for fact in response.facts {
            let last_checked = chrono::DateTime::parse_from_rfc3339(&fact.last_checked)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            self.store
                .upsert_synced_fact(
                    &fact.content,
                    &fact.hash,
                    fact.score,
                    fact.disputed,
                    last_checked,
                    &fact.semantics,
                    &fact.sources,
                )
                .await?;
        }

        Ok(())
    }
}

async fn load_or_generate_identity(path: &Path) -> Result<NodeIdentity, NodeError> {
    if path.exists() {
        let pem = tokio::fs::read_to_string(path).await?;
        return Ok(NodeIdentity::from_pkcs8_pem(&pem)?);
    }

    let identity = tokio::task::spawn_blocking(NodeIdentity::generate)
        .await
        .expect("key-generation worker panicked")?;
    tokio::fs::write(path, identity.to_pkcs8_pem()?).await?;
    Ok(identity)
}

/// Replays the chain from persisted blocks, or seals and persists the
/// genesis block on a brand-new store.
async fn load_or_seed_chain(store: &Store) -> Result<Blockchain, NodeError> {
    match store.tip_height().await? {
        Some(_) => {
            let blocks = store.blocks_since(0).await?;
            Ok(Blockchain::from_blocks(blocks)?)
        }
        None => {
            let genesis = Block::genesis();
            store.append_block(&genesis).await?;
            Ok(Blockchain::new())
        }
    }
}

/// The longest prefix of `blocks` whose heights run contiguously from
/// `local_height + 1`. Every sync strategy except `TimeRange` already
/// yields such a prefix; this guards `reconcile_with_peer`'s contiguous-
/// height requirement against a `TimeRange` selection that skips a height.
fn contiguous_prefix(blocks: &[&Block], local_height: u64) -> Vec<Block> {
    let mut expected = local_height + 1;
    let mut out = Vec::new();
    for block in blocks {
        if block.height != expected {
            break;
        }
        out.push((*block).clone());
        expected += 1;
    }
    out
}

/// A peer's `PeerAddress` only ever carries its `listen_port`; its
/// Verification API port is never exchanged over the wire, so it is
/// derived as `listen_port + 1`. `NodeConfig::validate` enforces that every
/// node (including this one) actually honors that relationship.
fn peer_api_base(peer: &PeerAddress) -> String {
    format!("http://{}:{}", peer.ip_address, peer.port + 1)
}

#[derive(Deserialize)]
struct ChainHeightResponse {
    height: i64,
}

#[derive(Deserialize)]
struct BlocksResponse {
    blocks: Vec<Block>,
}

#[derive(Serialize)]
struct FactsByHashRequest {
    fact_hashes: Vec<String>,
}

#[derive(Deserialize)]
struct FactWire {
    content: String,
    hash: String,
    score: u32,
    disputed: bool,
    last_checked: String,
    semantics: Semantics,
    sources: Vec<String>,
}

#[derive(Deserialize)]
struct FactsByHashResponse {
    facts: Vec<FactWire>,
}

/// Convenience constructor for callers that don't need a custom content
/// source (tests, local feeding via `ingest_text`).
pub async fn new_with_noop_source(config: NodeConfig) -> Result<Node, NodeError> {
    Node::new(config, Arc::new(NoopContentSource)).await
}
