use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use fc_node::{new_with_noop_source, NodeConfig};
use fc_transport::PeerAddress;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// FactChain ledger node daemon.
#[derive(Parser, Debug)]
#[command(
    name = "fc-node",
    version,
    about = "FactChain ledger node",
    long_about = "Runs a FactChain node: extracts facts from ingested text, seals them \
                  into a proof-of-work ledger, gossips over a signed TLS peer transport, \
                  and serves the HTTP verification API listeners read from."
)]
struct Cli {
    /// Host the peer transport's TLS listener binds to.
    #[arg(long, default_value = "0.0.0.0", env = "FC_LISTEN_HOST")]
    listen_host: String,

    /// Port the peer transport's TLS listener binds to.
    #[arg(long, default_value_t = 7700, env = "FC_LISTEN_PORT")]
    listen_port: u16,

    /// This node's publicly reachable IP, advertised to peers and used to
    /// filter this node out of gossiped peer lists. Defaults to listen_host.
    #[arg(long, env = "FC_PUBLIC_IP")]
    public_ip: Option<String>,

    /// Seed peer to dial at startup, as `host:port`.
    #[arg(long, env = "FC_BOOTSTRAP_PEER")]
    bootstrap_peer: Option<String>,

    /// PKCS#8 PEM path for this node's RSA signing identity. Generated on
    /// first run if absent.
    #[arg(long, default_value = "factchain_identity.pem", env = "FC_IDENTITY_KEY_PATH")]
    identity_key_path: PathBuf,

    /// PEM certificate chain for the TLS transport layer.
    #[arg(long, default_value = "factchain_tls_cert.pem", env = "FC_TLS_CERT_PATH")]
    tls_cert_path: PathBuf,

    /// PEM private key matching tls_cert_path.
    #[arg(long, default_value = "factchain_tls_key.pem", env = "FC_TLS_KEY_PATH")]
    tls_key_path: PathBuf,

    /// SQLite connection string.
    #[arg(long, default_value = "sqlite://factchain.db?mode=rwc", env = "FC_DATABASE_URL")]
    database_url: String,

    /// Proof-of-work difficulty floor applied to blocks this node seals.
    /// Must match (or exceed) every peer's difficulty or sealed blocks will
    /// be rejected by their chains.
    #[arg(long, default_value_t = fc_chain::SEAL_DIFFICULTY, env = "FC_DIFFICULTY")]
    difficulty: u32,

    /// How often, in seconds, the ingestion loop pulls new content.
    #[arg(long, default_value_t = 10_800, env = "FC_INGESTION_INTERVAL_SECS")]
    ingestion_interval_secs: u64,

    /// How often, in seconds, the sync loop reconciles against known peers.
    #[arg(long, default_value_t = 30, env = "FC_SYNC_INTERVAL_SECS")]
    sync_interval_secs: u64,

    /// Port the Verification API's HTTP server binds to.
    #[arg(long, default_value_t = 7701, env = "FC_API_PORT")]
    api_port: u16,

    /// Suppress log output to stderr.
    #[arg(long, default_value_t = false, env = "FC_QUIET")]
    quiet: bool,
}

fn parse_bootstrap_peer(raw: &str) -> Result<PeerAddress, String> {
    let (host, port) = raw.rsplit_once(':').ok_or_else(|| format!("expected host:port, got {raw}"))?;
    let port: u16 = port.parse().map_err(|_| format!("invalid port in {raw}"))?;
    Ok(PeerAddress {
        ip_address: host.to_string(),
        port,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::from_default_env().add_directive("fc_node=info".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let bootstrap_peer = cli
        .bootstrap_peer
        .as_deref()
        .map(parse_bootstrap_peer)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let config = NodeConfig {
        listen_host: cli.listen_host,
        listen_port: cli.listen_port,
        public_ip: cli.public_ip,
        bootstrap_peer,
        identity_key_path: cli.identity_key_path,
        tls_cert_path: cli.tls_cert_path,
        tls_key_path: cli.tls_key_path,
        database_url: cli.database_url,
        difficulty: cli.difficulty,
        ingestion_interval: Duration::from_secs(cli.ingestion_interval_secs),
        sync_interval: Duration::from_secs(cli.sync_interval_secs),
        api_port: cli.api_port,
        ..NodeConfig::default()
    };

    info!(
        listen_host = %config.listen_host,
        listen_port = config.listen_port,
        api_port = config.api_port,
        "starting FactChain node"
    );

    let node = new_with_noop_source(config).await?;

    let shutdown = CancellationToken::new();
    let ctrlc_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            ctrlc_shutdown.cancel();
        }
    });

    node.run(shutdown).await?;
    Ok(())
}
