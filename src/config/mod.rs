//! Configuration management for oracle tools
//!
//! Loads from YAML files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use ethers::types::Address;
use serde::Deserialize;

use crate::types::{ExpectedFeedId, TokenConfig};

pub const CLIENT_ID_VAR: &str = "REALTIME_FEED_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "REALTIME_FEED_CLIENT_SECRET";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub realtime_feed: RealtimeFeedConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
    pub persistence: PersistenceConfig,
    /// Token metadata table
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    /// Feed ids pinned per network and symbol
    #[serde(default)]
    pub expected_feed_ids: Vec<ExpectedFeedId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Network name, selects provider and ticker endpoints
    pub name: String,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// DataStore contract holding stored feed ids
    #[serde(default)]
    pub data_store: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeFeedConfig {
    /// Overrides the per-network provider endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Reports requested per fetch
    pub limit: u32,
    /// Blocks before the chain head to start fetching from
    pub block_lookback: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TickerConfig {
    /// Overrides the per-network ticker endpoint
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    /// Write the feed plan as CSV
    pub csv_enabled: bool,
}

impl AppConfig {
    /// Builder preloaded with defaults; sources are layered on top.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("network.name", "arbitrum")?
            .set_default("network.rpc_url", "https://arb1.arbitrum.io/rpc")?
            .set_default("realtime_feed.timeout_secs", 30)?
            .set_default("realtime_feed.limit", 20)?
            .set_default("realtime_feed.block_lookback", 10)?
            .set_default("persistence.data_dir", "./data")?
            .set_default("persistence.csv_enabled", true)?)
    }

    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (ORACLE_TOOLS_*)
            .add_source(Environment::with_prefix("ORACLE_TOOLS").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        let feeds = self
            .tokens
            .iter()
            .filter(|t| t.realtime_feed_id.is_some())
            .count();
        format!(
            "network={} tokens={} realtime_feeds={} pinned_feed_ids={} csv={}",
            self.network.name,
            self.tokens.len(),
            feeds,
            self.expected_feed_ids.len(),
            self.persistence.csv_enabled
        )
    }

    /// Realtime feed credentials from the environment.
    pub fn realtime_feed_credentials(&self) -> Result<(String, String)> {
        let read = |var: &str| -> Result<String> {
            match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => Ok(value),
                _ => bail!("Required environment variable {} is not set", var),
            }
        };
        Ok((read(CLIENT_ID_VAR)?, read(CLIENT_SECRET_VAR)?))
    }

    /// Validate required environment variables
    pub fn validate_env(&self) -> Result<()> {
        self.realtime_feed_credentials().map(|_| ())
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const YAML: &str = r#"
network:
  name: arbitrum
  data_store: "0xFD70de6b91282D8017aA4E741e9Ae325CAb992d8"
realtime_feed:
  limit: 5
tokens:
  - symbol: WETH
    address: "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"
    decimals: 18
    realtime_feed_id: "0x74aca63821bf7ead199e924d261d277cbec96d1026ab65267d655c51b4536914"
    realtime_feed_decimals: 8
  - symbol: USDC
    address: "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"
    decimals: 6
expected_feed_ids:
  - network: arbitrum
    symbol: WETH
    feed_id: "0x74aca63821bf7ead199e924d261d277cbec96d1026ab65267d655c51b4536914"
"#;

    fn parse(yaml: &str) -> AppConfig {
        AppConfig::defaults()
            .unwrap()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn file_values_override_defaults() {
        let config = parse(YAML);
        assert_eq!(config.network.name, "arbitrum");
        assert_eq!(config.realtime_feed.limit, 5);
        assert_eq!(config.realtime_feed.timeout_secs, 30);
        assert_eq!(config.realtime_feed.block_lookback, 10);
        assert!(config.network.data_store.is_some());
    }

    #[test]
    fn token_table_keeps_symbol_case() {
        let config = parse(YAML);
        assert_eq!(config.tokens.len(), 2);
        assert_eq!(config.tokens[0].symbol, "WETH");
        assert_eq!(config.tokens[0].realtime_feed_decimals, Some(8));
        assert!(config.tokens[1].realtime_feed_id.is_none());
        assert_eq!(config.expected_feed_ids[0].symbol, "WETH");
    }

    #[test]
    fn digest_omits_secrets() {
        let digest = parse(YAML).digest();
        assert!(digest.contains("realtime_feeds=1"));
        assert!(!digest.contains("SECRET"));
    }
}
