// crates/ticker-daemon/src/config.rs
//
// Runtime configuration for the epoch ticker daemon.
// Loaded from a TOML file or populated with defaults, then validated once
// and handed to the ticker as an explicit `TickerSettings` value.

use serde::Deserialize;
use std::fs;
use std::time::Duration;

use ticker_core::TickerError;
use ticker_scheduler::TickerSettings;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerConfig {
    /// Source chain and epoch parameters.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Explicit start height for a fresh deployment. 0 means unset.
    /// Always overridden by an existing checkpoint.
    #[serde(default)]
    pub ticker_begin_block: u64,

    /// Seconds to wait after each emitted epoch.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Production epoch store.
    #[serde(default)]
    pub store: StoreConfig,

    /// Simulation mode: separate store, short interval, capped emissions.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub epoch: EpochConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoints, tried in rotation.
    #[serde(default)]
    pub nodes: Vec<RpcNode>,

    /// Attempts per head poll across all nodes.
    #[serde(default = "default_retry")]
    pub retry: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcNode {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpochConfig {
    /// Blocks per epoch.
    #[serde(default = "default_epoch_height")]
    pub height: u64,

    /// Confirmation margin subtracted from the chain head.
    #[serde(default)]
    pub head_offset: u64,

    /// Source chain block time in seconds.
    #[serde(default = "default_block_time")]
    pub block_time: u64,

    /// Maximum number of retained history entries.
    #[serde(default = "default_history_length")]
    pub history_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// RocksDB directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Key prefix. Defaults to one derived from the chain id.
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// RocksDB directory for simulation runs. Required when enabled.
    #[serde(default)]
    pub data_dir: Option<String>,

    #[serde(default = "default_emission_cap")]
    pub emission_cap: u64,

    #[serde(default = "default_simulation_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_chain_id() -> u64 {
    1
}

fn default_retry() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_epoch_height() -> u64 {
    10
}

fn default_block_time() -> u64 {
    12
}

fn default_history_length() -> usize {
    1000
}

fn default_data_dir() -> String {
    "~/.epoch-ticker/data".to_string()
}

fn default_emission_cap() -> u64 {
    10
}

fn default_simulation_interval_secs() -> u64 {
    1
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            ticker_begin_block: 0,
            interval_secs: default_interval_secs(),
            store: StoreConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            rpc: RpcConfig::default(),
            epoch: EpochConfig::default(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            retry: default_retry(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            height: default_epoch_height(),
            head_offset: 0,
            block_time: default_block_time(),
            history_length: default_history_length(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            namespace: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            data_dir: None,
            emission_cap: default_emission_cap(),
            interval_secs: default_simulation_interval_secs(),
        }
    }
}

impl TickerConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, TickerError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| TickerError::Configuration(format!("Cannot read {}: {}", path, e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, TickerError> {
        toml::from_str(contents)
            .map_err(|e| TickerError::Configuration(format!("Invalid config: {}", e)))
    }

    /// Reject configurations the ticker cannot run with.
    pub fn validate(&self) -> Result<(), TickerError> {
        if self.chain.rpc.nodes.is_empty() {
            return Err(TickerError::Configuration(
                "chain.rpc.nodes must list at least one RPC endpoint".to_string(),
            ));
        }
        if self.chain.epoch.height == 0 {
            return Err(TickerError::Configuration(
                "chain.epoch.height must be at least 1".to_string(),
            ));
        }
        if self.chain.epoch.block_time == 0 {
            return Err(TickerError::Configuration(
                "chain.epoch.block_time must be at least 1 second".to_string(),
            ));
        }
        if self.chain.epoch.history_length == 0 {
            return Err(TickerError::Configuration(
                "chain.epoch.history_length must be at least 1".to_string(),
            ));
        }
        if self.simulation.enabled && self.simulation.data_dir.is_none() {
            return Err(TickerError::Configuration(
                "Simulation mode requires simulation.data_dir".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rpc_urls(&self) -> Vec<String> {
        self.chain.rpc.nodes.iter().map(|n| n.url.clone()).collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.chain.rpc.request_timeout_secs)
    }

    pub fn namespace(&self) -> String {
        self.store
            .namespace
            .clone()
            .unwrap_or_else(|| format!("epoch_ticker:{}", self.chain.chain_id))
    }

    /// Directory of the store this run should use.
    pub fn store_dir(&self) -> Result<&str, TickerError> {
        if self.simulation.enabled {
            self.simulation.data_dir.as_deref().ok_or_else(|| {
                TickerError::Configuration("Simulation store not configured".to_string())
            })
        } else {
            Ok(&self.store.data_dir)
        }
    }

    /// Loop parameters for this run. `end_block` is the optional
    /// command-line end height.
    pub fn ticker_settings(&self, end_block: Option<u64>) -> TickerSettings {
        let (interval_secs, emission_cap) = if self.simulation.enabled {
            (
                self.simulation.interval_secs,
                Some(self.simulation.emission_cap),
            )
        } else {
            (self.interval_secs, None)
        };

        TickerSettings {
            epoch_height: self.chain.epoch.height,
            head_offset: self.chain.epoch.head_offset,
            block_time_secs: self.chain.epoch.block_time,
            history_length: self.chain.epoch.history_length,
            epoch_interval: Duration::from_secs(interval_secs),
            begin_block: Some(self.ticker_begin_block).filter(|b| *b > 0),
            end_block,
            emission_cap,
        }
    }
}
