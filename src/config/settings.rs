use crate::core::{MiningMode, MiningTarget};
use crate::error::{ChainError, Result};
use crate::storage::DEFAULT_BUFFER_CAPACITY;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static DEFAULT_INTAKE_ADDR: &str = "0.0.0.0:8080";
static DEFAULT_ANNOUNCE_ADDR: &str = "0.0.0.0:8081";

// Target of 2^245, roughly thirty seconds of work on a single core
const DEFAULT_DIFFICULTY: u32 = 11;

const INTAKE_ADDRESS_KEY: &str = "INTAKE_ADDRESS";
const ANNOUNCE_ADDRESS_KEY: &str = "ANNOUNCE_ADDRESS";
const STAGING_DIR_KEY: &str = "STAGING_DIR";
const MINING_DIFFICULTY_KEY: &str = "MINING_DIFFICULTY";
const IPFS_API_KEY: &str = "IPFS_API";
const PYTHON_BIN_KEY: &str = "PYTHON_BIN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub intake_addr: String,
    pub announce_addr: String,
    pub staging_dir: PathBuf,
    pub buffer_capacity: usize,
    /// Cap on concurrent connections per listener; unlimited when absent
    pub max_connections: Option<usize>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            intake_addr: DEFAULT_INTAKE_ADDR.to_string(),
            announce_addr: DEFAULT_ANNOUNCE_ADDR.to_string(),
            staging_dir: env::temp_dir().join("compute-chain-staging"),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_connections: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningSettings {
    pub pre_block_hash: String,
    pub difficulty: u32,
    pub mode: MiningMode,
}

impl Default for MiningSettings {
    fn default() -> Self {
        Self {
            pre_block_hash: "genesis".to_string(),
            difficulty: DEFAULT_DIFFICULTY,
            mode: MiningMode::SingleShot,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Ipfs,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub ipfs_binary: String,
    pub ipfs_api: String,
    pub local_dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::Ipfs,
            ipfs_binary: "ipfs".to_string(),
            ipfs_api: "/ip4/127.0.0.1/tcp/5001".to_string(),
            local_dir: PathBuf::from("data/objects"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub interpreter: String,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSettings {
    pub use_tailscale: bool,
    pub tailscale_binary: String,
    pub static_peers: Vec<String>,
    pub intake_port: u16,
    pub announce_port: u16,
    /// Push mined blocks to the peers' announcement port
    pub announce_blocks: bool,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            use_tailscale: true,
            tailscale_binary: "tailscale".to_string(),
            static_peers: Vec::new(),
            intake_port: 8080,
            announce_port: 8081,
            announce_blocks: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    pub algorithms_dir: PathBuf,
    pub datasets_dir: PathBuf,
    pub interval_secs: u64,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            algorithms_dir: PathBuf::from("data/algorithms"),
            datasets_dir: PathBuf::from("data/datasets"),
            interval_secs: 30,
        }
    }
}

/// Node configuration, read from an optional TOML file and then the
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeSettings,
    pub mining: MiningSettings,
    pub store: StoreSettings,
    pub executor: ExecutorSettings,
    pub peers: PeerSettings,
    pub broadcast: BroadcastSettings,
}

impl Config {
    /// Defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    ChainError::Config(format!("Failed to read {}: {e}", path.display()))
                })?;
                Self::from_toml(&text)?
            }
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `KEY=value` overrides from any lookup, usually the environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(INTAKE_ADDRESS_KEY) {
            self.node.intake_addr = addr;
        }
        if let Some(addr) = lookup(ANNOUNCE_ADDRESS_KEY) {
            self.node.announce_addr = addr;
        }
        if let Some(dir) = lookup(STAGING_DIR_KEY) {
            self.node.staging_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(MINING_DIFFICULTY_KEY) {
            self.mining.difficulty = raw.parse().map_err(|e| {
                ChainError::Config(format!("{MINING_DIFFICULTY_KEY}={raw} is not a number: {e}"))
            })?;
        }
        if let Some(api) = lookup(IPFS_API_KEY) {
            self.store.ipfs_api = api;
        }
        if let Some(bin) = lookup(PYTHON_BIN_KEY) {
            self.executor.interpreter = bin;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.mining.difficulty > 256 {
            return Err(ChainError::Config(format!(
                "mining.difficulty must be at most 256, got {}",
                self.mining.difficulty
            )));
        }
        if self.node.buffer_capacity == 0 {
            return Err(ChainError::Config(
                "node.buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.node.max_connections == Some(0) {
            return Err(ChainError::Config(
                "node.max_connections must be at least 1".to_string(),
            ));
        }
        if self.broadcast.interval_secs == 0 {
            return Err(ChainError::Config(
                "broadcast.interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mining_target(&self) -> Result<MiningTarget> {
        MiningTarget::from_difficulty(self.mining.difficulty)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.broadcast.interval_secs)
    }
}
