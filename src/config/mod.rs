use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub chain: ChainConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    pub market: MarketConfig,
    #[serde(default)]
    pub claim: ClaimConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub valkey: ValkeyConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint for the market chain
    pub rpc_url: String,
    /// Prediction-market contract address (0x-prefixed)
    pub contract_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    /// Subgraph query endpoint (secondary index, best-effort)
    #[serde(default = "default_indexer_url")]
    pub url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_indexer_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Market to watch
    pub market_id: u64,
    /// Market type when already known by the caller (1 = free entry).
    /// When set, the secondary index is not consulted for the type.
    #[serde(default)]
    pub market_type_hint: Option<u8>,
    /// Wallet to resolve entitlement for (none = disconnected view)
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimConfig {
    /// Enable live claim submission (false = paper mode, logs only).
    #[serde(default)]
    pub execute: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Poll interval for both authoritative reads, in seconds.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValkeyConfig {
    #[serde(default = "default_valkey_url")]
    pub url: String,
    /// Key namespace prefix, e.g. "freeclaim" → "freeclaim:notification:{fid}"
    #[serde(default = "default_valkey_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_indexer_url() -> String {
    "https://api.studio.thegraph.com/query/markets/v2".to_string()
}
fn default_indexer_timeout() -> u64 {
    5
}
fn default_poll_interval() -> u64 {
    10
}
fn default_valkey_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_valkey_prefix() -> String {
    "freeclaim".to_string()
}
fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            url: default_indexer_url(),
            timeout_secs: default_indexer_timeout(),
        }
    }
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self { execute: false }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
        }
    }
}

impl Default for ValkeyConfig {
    fn default() -> Self {
        Self {
            url: default_valkey_url(),
            prefix: default_valkey_prefix(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.overlay_env();
        Ok(config)
    }

    /// Load an env-only config with defaults (no file needed).
    pub fn from_env() -> Self {
        Config {
            chain: ChainConfig {
                rpc_url: std::env::var("FREECLAIM_RPC_URL").unwrap_or_default(),
                contract_address: std::env::var("FREECLAIM_CONTRACT").unwrap_or_default(),
            },
            indexer: IndexerConfig {
                url: std::env::var("FREECLAIM_INDEXER_URL")
                    .unwrap_or_else(|_| default_indexer_url()),
                timeout_secs: default_indexer_timeout(),
            },
            market: MarketConfig {
                market_id: std::env::var("FREECLAIM_MARKET_ID")
                    .ok()
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(0),
                market_type_hint: std::env::var("FREECLAIM_MARKET_TYPE")
                    .ok()
                    .and_then(|raw| raw.parse().ok()),
                wallet_address: std::env::var("FREECLAIM_WALLET").ok(),
            },
            claim: ClaimConfig::default(),
            polling: PollingConfig::default(),
            valkey: ValkeyConfig {
                url: std::env::var("FREECLAIM_VALKEY_URL")
                    .unwrap_or_else(|_| default_valkey_url()),
                prefix: default_valkey_prefix(),
            },
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Overlay deployment-specific values from environment variables
    /// (endpoints and wallet never have to live in the config file).
    fn overlay_env(&mut self) {
        if let Ok(url) = std::env::var("FREECLAIM_RPC_URL") {
            self.chain.rpc_url = url;
        }
        if let Ok(addr) = std::env::var("FREECLAIM_CONTRACT") {
            self.chain.contract_address = addr;
        }
        if let Ok(url) = std::env::var("FREECLAIM_INDEXER_URL") {
            self.indexer.url = url;
        }
        if let Ok(wallet) = std::env::var("FREECLAIM_WALLET") {
            self.market.wallet_address = Some(wallet);
        }
        if let Ok(url) = std::env::var("FREECLAIM_VALKEY_URL") {
            self.valkey.url = url;
        }
    }
}
