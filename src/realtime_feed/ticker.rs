//! Ticker price client
//!
//! Pulls min/max quotes for every listed token from the exchange's price
//! ticker API. Used as the independent price source for report validation.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use super::TickerPriceSource;
use crate::error::{OracleError, Result};
use crate::types::{ticker_key, TickerPrice, TickerPrices};

/// Ticker endpoint for a known network.
pub fn tickers_url_for_network(network: &str) -> Result<&'static str> {
    match network {
        "arbitrum" => Ok("https://arbitrum-api.gmxinfra.io/prices/tickers"),
        "avalanche" => Ok("https://avalanche-api.gmxinfra.io/prices/tickers"),
        other => Err(OracleError::ConfigMismatch(format!(
            "no ticker endpoint for network {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerEntry {
    pub token_address: Address,
    pub min_price: String,
    pub max_price: String,
}

fn parse_price(token: &Address, raw: &str) -> Result<U256> {
    U256::from_dec_str(raw.trim()).map_err(|e| {
        OracleError::Decode(format!("invalid ticker price {:?} for {:#x}: {}", raw, token, e))
    })
}

/// Index ticker entries by lower-cased token address.
pub fn index_tickers(entries: &[TickerEntry]) -> Result<TickerPrices> {
    let mut prices = TickerPrices::with_capacity(entries.len());
    for entry in entries {
        prices.insert(
            ticker_key(&entry.token_address),
            TickerPrice {
                min: parse_price(&entry.token_address, &entry.min_price)?,
                max: parse_price(&entry.token_address, &entry.max_price)?,
            },
        );
    }
    Ok(prices)
}

pub struct TickerClient {
    client: Client,
    url: String,
}

impl TickerClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl TickerPriceSource for TickerClient {
    async fn fetch_ticker_prices(&self) -> Result<TickerPrices> {
        let entries: Vec<TickerEntry> = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let prices = index_tickers(&entries)?;
        info!(count = prices.len(), "✅ Ticker prices fetched");
        Ok(prices)
    }
}
