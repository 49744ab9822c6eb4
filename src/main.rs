//! Realtime feed validation
//!
//! Usage: cargo run --bin oracle-tools
//!
//! Validates every configured realtime feed against the provider and the
//! ticker service, then writes the configuration plan for review.

use anyhow::{Context, Result};
use tracing::{error, info};

use oracle_tools::config::AppConfig;
use oracle_tools::persistence::PlanStore;
use oracle_tools::realtime_feed::{
    tickers_url_for_network, DataStoreReader, FeedBatch, FeedValidator, RealtimeFeedClient,
    TickerClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    oracle_tools::init_tracing();

    let config = AppConfig::load()?;
    info!(config = %config, "🚀 Starting realtime feed validation");
    config.validate_env()?;

    let network = config.network.name.as_str();
    let (client_id, client_secret) = config.realtime_feed_credentials()?;
    let reports =
        RealtimeFeedClient::from_config(network, &config.realtime_feed, client_id, client_secret)?;

    let ticker_url = match &config.ticker.url {
        Some(url) => url.clone(),
        None => tickers_url_for_network(network)?.to_string(),
    };
    let tickers = TickerClient::new(&ticker_url)?;

    let data_store = config
        .network
        .data_store
        .context("network.data_store is not configured")?;
    let store = DataStoreReader::new(&config.network.rpc_url, data_store)?;
    let block_number = store
        .block_number()
        .await
        .context("Failed to read chain head")?;
    info!(block_number, "📦 Anchoring report fetches at chain head");

    let validator = FeedValidator::new(reports, network, config.expected_feed_ids.clone());
    let plan = match FeedBatch::new(&validator, &tickers, &store)
        .run(&config.tokens, block_number)
        .await
    {
        Ok(plan) => plan,
        Err(e) => {
            error!(error = %e, "❌ Realtime feed validation failed, nothing will be configured");
            return Err(e.into());
        }
    };

    for update in plan.updates() {
        info!(
            symbol = %update.symbol,
            token = %format!("{:#x}", update.token),
            feed_id = %format!("{:#x}", update.feed_id),
            multiplier = %update.multiplier,
            "planned realtime feed update"
        );
    }

    if plan.update_count() == 0 {
        info!("no realtime feeds to update");
    }

    if config.persistence.csv_enabled {
        PlanStore::new(&config.persistence.data_dir)?.save(network, &plan)?;
    }

    Ok(())
}
