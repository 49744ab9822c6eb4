//! Core types shared by the signing and realtime feed halves
//!
//! Defines token metadata, ticker quotes, the oracle submission bundle and
//! decoded realtime feed reports.

use ethers::types::{Address, Bytes, H256, I256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Static token metadata supplied by configuration.
///
/// Every field is optional because configuration tables carry tokens at
/// different stages of onboarding; validation decides which are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub realtime_feed_id: Option<H256>,
    #[serde(default)]
    pub realtime_feed_decimals: Option<u8>,
}

/// Feed id a token is expected to use on a given network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedFeedId {
    pub network: String,
    pub symbol: String,
    pub feed_id: H256,
}

/// Min/max quote for one token from the ticker service, in 30-decimal
/// per-unit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerPrice {
    pub min: U256,
    pub max: U256,
}

/// Ticker quotes keyed by lower-cased `0x` token address.
pub type TickerPrices = HashMap<String, TickerPrice>;

/// Canonical ticker lookup key for an address.
pub fn ticker_key(address: &Address) -> String {
    format!("{:#x}", address).to_lowercase()
}

/// Bundle consumed by the on-chain oracle verifier.
///
/// `signatures[k]` and lane `k` of the unpacked `compacted_prices` always
/// describe the same (token, signer) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleSubmission {
    pub price_feed_tokens: Vec<Address>,
    pub signer_info: U256,
    pub tokens: Vec<Address>,
    pub compacted_oracle_block_numbers: Vec<U256>,
    pub compacted_prices: Vec<U256>,
    pub signatures: Vec<Bytes>,
}

/// A price report from the realtime feed provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeFeedReport {
    pub feed_id: H256,
    pub observation_timestamp: u32,
    pub median_price: I256,
    pub min_price: I256,
    pub max_price: I256,
    pub min_block_number: u64,
    pub max_block_number: u64,
    pub max_block_hash: H256,
    pub max_block_timestamp: u64,
    /// Original blob, kept for audit.
    pub blob: Bytes,
}

/// Multi-signature envelope around a single report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlob {
    pub report_context: [H256; 3],
    pub report: RealtimeFeedReport,
    pub rs: Vec<H256>,
    pub ss: Vec<H256>,
    pub raw_vs: H256,
}

/// Outcome of validating a single token's realtime feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationResult {
    pub should_update: bool,
    pub realtime_feed_multiplier: Option<U256>,
}

impl ValidationResult {
    /// Stored feed id already matches the configuration.
    pub fn skipped() -> Self {
        Self {
            should_update: false,
            realtime_feed_multiplier: None,
        }
    }

    pub fn ready(multiplier: U256) -> Self {
        Self {
            should_update: true,
            realtime_feed_multiplier: Some(multiplier),
        }
    }
}

/// One entry in the realtime feed configuration plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedUpdate {
    pub symbol: String,
    pub token: Address,
    pub feed_id: H256,
    pub multiplier: U256,
}

/// Terminal state for a token in a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// No realtime feed configured for the token.
    NotConfigured,
    /// Stored on-chain feed id already matches.
    AlreadyConfigured,
    Ready(FeedUpdate),
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedStatus::NotConfigured => write!(f, "not-configured"),
            FeedStatus::AlreadyConfigured => write!(f, "already-configured"),
            FeedStatus::Ready(update) => write!(f, "ready(multiplier={})", update.multiplier),
        }
    }
}
