//! Network configuration - chain id → rollup endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "native")]
use std::path::PathBuf;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming a network file.
pub const NETWORKS_ENV: &str = "AZTEC_HISTORY_NETWORKS";

pub const MAINNET_CHAIN_ID: u64 = 1;
/// Aztec Connect testnet (`0xA57EC`).
pub const TESTNET_CHAIN_ID: u64 = 0xA57EC;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MIN_CONFIRMATION: u32 = 1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("Invalid network config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read network config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where and how the rollup client talks to the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub rollup_provider_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Ethereum block confirmations required before a deposit is accepted.
    #[serde(default = "default_min_confirmation")]
    pub min_confirmation: u32,
}

fn default_poll_interval_ms() -> u64 { DEFAULT_POLL_INTERVAL_MS }
fn default_min_confirmation() -> u32 { DEFAULT_MIN_CONFIRMATION }

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            rollup_provider_url: url.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            min_confirmation: DEFAULT_MIN_CONFIRMATION,
        }
    }
    pub fn with_poll_interval(mut self, interval: Duration) -> Self { self.poll_interval_ms = interval.as_millis() as u64; self }
    pub fn with_min_confirmation(mut self, n: u32) -> Self { self.min_confirmation = n; self }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Static, read-only table of supported networks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    endpoints: BTreeMap<u64, Endpoint>,
}

impl NetworkConfig {
    pub fn empty() -> Self { Self::default() }

    /// Networks supported out of the box.
    pub fn builtin() -> Self {
        Self::empty()
            .with_endpoint(MAINNET_CHAIN_ID, Endpoint::new("https://api.aztec.network/aztec-connect-prod/falafel"))
            .with_endpoint(TESTNET_CHAIN_ID, Endpoint::new("https://api.aztec.network/aztec-connect-testnet/falafel"))
    }

    pub fn with_endpoint(mut self, chain_id: u64, endpoint: Endpoint) -> Self {
        self.endpoints.insert(chain_id, endpoint);
        self
    }

    pub fn get(&self, chain_id: u64) -> Option<&Endpoint> {
        self.endpoints.get(&chain_id)
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.endpoints.contains_key(&chain_id)
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.endpoints.keys().copied()
    }

    pub fn len(&self) -> usize { self.endpoints.len() }
    pub fn is_empty(&self) -> bool { self.endpoints.is_empty() }

    /// Entries in `other` replace entries for the same chain id.
    pub fn merge(mut self, other: NetworkConfig) -> Self {
        self.endpoints.extend(other.endpoints);
        self
    }

    /// Parse `{"<chain id>": {"rollup_provider_url": ...}, ...}`. Keys may be decimal or `0x` hex.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let table: BTreeMap<String, Endpoint> = serde_json::from_str(raw)?;
        let mut endpoints = BTreeMap::new();
        for (key, endpoint) in table {
            endpoints.insert(parse_chain_id(&key)?, endpoint);
        }
        Ok(Self { endpoints })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Builtin table overlaid with a network file, looked up in order:
    /// `explicit`, `$AZTEC_HISTORY_NETWORKS`, `<config_dir>/aztec-history/networks.json`.
    ///
    /// A named file must exist; the default location may be absent.
    #[cfg(feature = "native")]
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(NETWORKS_ENV).ok().filter(|s| !s.is_empty()).map(PathBuf::from));
        let path = match named {
            Some(path) => path,
            None => match default_networks_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::builtin()),
            },
        };
        let overlay = Self::load(&path)?;
        tracing::debug!(path = %path.display(), networks = overlay.len(), "Loaded network file");
        Ok(Self::builtin().merge(overlay))
    }

    pub fn to_json(&self) -> serde_json::Value {
        let table: BTreeMap<String, &Endpoint> =
            self.endpoints.iter().map(|(id, e)| (id.to_string(), e)).collect();
        serde_json::json!(table)
    }
}

#[cfg(feature = "native")]
fn default_networks_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aztec-history").join("networks.json"))
}

/// Chain ids arrive as decimal or as the `0x`-prefixed hex string `eth_chainId` returns.
pub fn parse_chain_id(value: &str) -> Result<u64, ConfigError> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| ConfigError::InvalidChainId(value.to_string()))
}
