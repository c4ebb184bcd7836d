// crates/ticker-daemon/src/main.rs
//
// Binary entrypoint for the epoch ticker daemon.
//
// Initializes tracing, parses CLI arguments, loads configuration, opens the
// epoch store and the chain head client, installs the signal listener, and
// runs the epoch loop until shutdown. Every exit path returns status 0: the
// process is supervised and restarted externally.

mod config;

use std::sync::Arc;

use clap::Parser;
use config::TickerConfig;

use ticker_chain::RpcHeadClient;
use ticker_core::TickerError;
use ticker_scheduler::{listen_for_signals, EpochTicker, ShutdownCoordinator};
use ticker_store::RocksEpochStore;

/// Epoch ticker: partitions confirmed chain blocks into fixed-size epochs.
#[derive(Parser, Debug)]
#[command(name = "epoch-ticker", version = "0.1.0", about = "Epoch ticker daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.epoch-ticker/config.toml")]
    config: String,

    /// Run in simulation mode against the simulation store.
    #[arg(long)]
    simulate: bool,

    /// Initial end height. Replaced by the live range on the first poll.
    end: Option<u64>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Epoch ticker exiting: {}", e);
    }
    tracing::info!("Shutting down");
}

async fn run(args: Args) -> Result<(), TickerError> {
    // Load configuration from TOML file, falling back to defaults if the file
    // is not found.
    let config_path = expand_tilde(&args.config);
    let mut config = match TickerConfig::load(&config_path) {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", config_path);
            cfg
        }
        Err(e) => {
            tracing::warn!("{}. Using defaults.", e);
            TickerConfig::default()
        }
    };

    // CLI --simulate flag overrides the config file value.
    if args.simulate {
        config.simulation.enabled = true;
    }
    config.validate()?;

    if config.simulation.enabled {
        tracing::info!(
            "Simulation mode is on (emission cap {})",
            config.simulation.emission_cap
        );
    }
    tracing::info!("Chain id: {}", config.chain.chain_id);
    tracing::info!(
        "Epoch height: {} blocks, head offset: {}, block time: {}s",
        config.chain.epoch.height,
        config.chain.epoch.head_offset,
        config.chain.epoch.block_time
    );

    let store_dir = expand_tilde(config.store_dir()?);
    let store = Arc::new(RocksEpochStore::open(&store_dir, &config.namespace())?);
    tracing::info!("Epoch store at {} (namespace {})", store_dir, config.namespace());

    let chain = Arc::new(RpcHeadClient::new(
        config.rpc_urls(),
        config.chain.rpc.retry,
        config.request_timeout(),
    )?);
    for url in chain.endpoints() {
        tracing::debug!("RPC node {}", url);
    }

    let shutdown = ShutdownCoordinator::new();
    let signal_shutdown = shutdown.clone();
    let signals = tokio::spawn(async move {
        if let Err(e) = listen_for_signals(signal_shutdown).await {
            tracing::error!("Signal listener error: {}", e);
        }
    });

    let mut ticker = EpochTicker::new(config.ticker_settings(args.end), chain, store, shutdown);
    let result = ticker.run().await;

    signals.abort();
    result
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_home_prefix() {
        let expanded = expand_tilde("~/.epoch-ticker/config.toml");
        if let Some(home) = dirs::home_dir() {
            assert!(expanded.starts_with(&*home.to_string_lossy()));
            assert!(expanded.ends_with(".epoch-ticker/config.toml"));
        }
    }

    #[test]
    fn leaves_absolute_paths_alone() {
        assert_eq!(expand_tilde("/etc/ticker.toml"), "/etc/ticker.toml");
    }

    #[test]
    fn parses_positional_end_height() {
        let args = Args::parse_from(["epoch-ticker", "--simulate", "17000500"]);
        assert!(args.simulate);
        assert_eq!(args.end, Some(17_000_500));
        assert_eq!(args.config, "~/.epoch-ticker/config.toml");
    }

    #[test]
    fn end_height_is_optional() {
        let args = Args::parse_from(["epoch-ticker", "--config", "/etc/ticker.toml"]);
        assert!(!args.simulate);
        assert_eq!(args.end, None);
    }
}
