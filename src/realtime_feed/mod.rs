//! Realtime feed module - third-party signed price reports
//!
//! Fetches provider reports, decodes them and cross-checks them against the
//! ticker price service before a feed is configured on chain.

mod batch;
mod client;
mod data_store;
mod decoder;
mod ticker;
mod validator;

pub use batch::{FeedBatch, FeedPlan};
pub use client::{
    base_url_for_network, is_chronological, sign_request, RealtimeFeedClient, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
pub use data_store::{hash_string, realtime_feed_id_key, DataStoreReader};
pub use decoder::{decode_blob, decode_hex_blob, encode_blob};
pub use ticker::{index_tickers, tickers_url_for_network, TickerClient, TickerEntry};
pub use validator::{
    FeedValidator, ValidationRequest, MAX_SPREAD_BPS, PRICE_DECIMALS_BUDGET,
};

use async_trait::async_trait;
use ethers::types::{Address, H256};

use crate::error::Result;
use crate::types::{RealtimeFeedReport, TickerPrices};

/// Source of the latest signed report for a feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_latest(&self, feed_id: H256, block_number: u64) -> Result<RealtimeFeedReport>;
}

/// Independent ticker quotes keyed by lower-cased token address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickerPriceSource: Send + Sync {
    async fn fetch_ticker_prices(&self) -> Result<TickerPrices>;
}

/// Feed ids already stored on chain; zero when unset.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedIdStore: Send + Sync {
    async fn stored_feed_id(&self, token: Address) -> Result<H256>;
}
