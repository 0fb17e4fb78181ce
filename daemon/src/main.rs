//! Ripple daemon: runs a trust network node and provisions its accounts.

mod provision;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ripple_node::{
    init_logging, LogFormat, NodeConfig, RippleNode, ShutdownController, SignalAction,
};
use ripple_store_lmdb::LmdbStore;

#[derive(Parser)]
#[command(name = "ripple-daemon", about = "Trust network payment node daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "RIPPLE_CONFIG")]
    config: Option<PathBuf>,

    /// Name peers use for this server ("host" or "host:port").
    #[arg(long, env = "RIPPLE_SERVER_ADDRESS")]
    server_address: Option<String>,

    /// Interface to bind the UDP socket on.
    #[arg(long, env = "RIPPLE_BIND_HOST")]
    bind_host: Option<String>,

    /// UDP port (default 2012).
    #[arg(long, env = "RIPPLE_PORT")]
    port: Option<u16>,

    /// Data directory for ledger storage.
    #[arg(long, env = "RIPPLE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log format: "human" or "json".
    #[arg(long, env = "RIPPLE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "RIPPLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "RIPPLE_ENABLE_METRICS")]
    metrics: bool,

    /// Metrics endpoint port.
    #[arg(long, env = "RIPPLE_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Manage local accounts.
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Manage relations with peer accounts.
    Relation {
        #[command(subcommand)]
        action: RelationAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Serve until SIGINT/SIGTERM.
    Run,
}

#[derive(clap::Subcommand)]
enum AccountAction {
    /// Create an account, or replace its client key.
    Add {
        username: String,
        /// Hex-encoded key shared with the account's client.
        #[arg(long)]
        key: String,
    },
}

#[derive(clap::Subcommand)]
enum RelationAction {
    /// Create a relation, or replace its key.
    Add {
        account: String,
        peer_username: String,
        peer_server: String,
        /// Hex-encoded key shared with the peer server.
        #[arg(long)]
        key: String,
    },
}

impl Cli {
    /// Overlay CLI flags and env vars on the file (or default) config.
    fn merge(&self, base: NodeConfig) -> NodeConfig {
        NodeConfig {
            server_address: self.server_address.clone().unwrap_or(base.server_address),
            bind_host: self.bind_host.clone().unwrap_or(base.bind_host),
            port: self.port.unwrap_or(base.port),
            data_dir: self.data_dir.clone().unwrap_or(base.data_dir),
            log_format: self.log_format.clone().unwrap_or(base.log_format),
            log_level: self.log_level.clone().unwrap_or(base.log_level),
            enable_metrics: self.metrics || base.enable_metrics,
            metrics_port: self.metrics_port.unwrap_or(base.metrics_port),
            ..base
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(&path.to_string_lossy())?,
        None => NodeConfig::default(),
    };
    let config = cli.merge(base);
    let format: LogFormat = config.log_format.parse().map_err(anyhow::Error::msg)?;
    init_logging(format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    let store = Arc::new(LmdbStore::open(&config.data_dir, config.lmdb_map_size)?);

    match cli.command {
        Command::Node {
            action: NodeAction::Run,
        } => run_node(config, store).await,
        Command::Account {
            action: AccountAction::Add { username, key },
        } => provision::add_account(&store, &username, &key),
        Command::Relation {
            action:
                RelationAction::Add {
                    account,
                    peer_username,
                    peer_server,
                    key,
                },
        } => provision::add_relation(&store, &account, &peer_username, &peer_server, &key),
    }
}

async fn run_node(config: NodeConfig, store: Arc<LmdbStore>) -> anyhow::Result<()> {
    tracing::info!(
        server = %config.server_address,
        bind = %config.bind_address(),
        data_dir = %config.data_dir.display(),
        metrics = config.enable_metrics,
        "Starting ripple node"
    );
    let node = RippleNode::bind(config, store.clone(), store).await?;
    let signals = tokio::spawn(watch_signals(node.shutdown_controller()));

    node.run().await?;
    signals.abort();

    tracing::info!("ripple daemon exited cleanly");
    Ok(())
}

/// The first signal drains; enough repeated signals exit immediately.
async fn watch_signals(shutdown: ShutdownController) {
    loop {
        let signal = ShutdownController::next_signal().await;
        match shutdown.on_signal() {
            SignalAction::Drain => {
                tracing::info!(signal, "Shutdown signal received, draining in-flight work")
            }
            SignalAction::Wait => tracing::warn!(signal, "still draining"),
            SignalAction::ForceExit => {
                tracing::error!(signal, "forced exit");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_settings() {
        let cli = Cli::parse_from([
            "ripple-daemon",
            "--port",
            "4000",
            "--metrics",
            "node",
            "run",
        ]);
        let base = NodeConfig {
            server_address: "bank.example".into(),
            port: 3000,
            ..NodeConfig::default()
        };
        let config = cli.merge(base);
        assert_eq!(config.port, 4000);
        assert!(config.enable_metrics);
        assert_eq!(config.server_address, "bank.example");
    }

    #[test]
    fn relation_add_parses_positionals() {
        let cli = Cli::parse_from([
            "ripple-daemon",
            "relation",
            "add",
            "alice",
            "bob",
            "bank.example:4000",
            "--key",
            "00ff",
        ]);
        match cli.command {
            Command::Relation {
                action:
                    RelationAction::Add {
                        account,
                        peer_server,
                        key,
                        ..
                    },
            } => {
                assert_eq!(account, "alice");
                assert_eq!(peer_server, "bank.example:4000");
                assert_eq!(key, "00ff");
            }
            _ => panic!("expected relation add"),
        }
    }
}
