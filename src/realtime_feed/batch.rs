//! Sequential feed validation batch
//!
//! Validates every configured token one at a time. The first failure aborts
//! the whole run: a half-validated plan is never returned.

use ethers::types::H256;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::{FeedIdStore, FeedValidator, ReportSource, TickerPriceSource, ValidationRequest};
use crate::error::{OracleError, Result};
use crate::types::{FeedStatus, FeedUpdate, TickerPrices, TokenConfig};

/// Result of a batch run, in token order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPlan {
    pub statuses: Vec<(String, FeedStatus)>,
}

impl FeedPlan {
    pub fn updates(&self) -> impl Iterator<Item = &FeedUpdate> {
        self.statuses.iter().filter_map(|(_, status)| match status {
            FeedStatus::Ready(update) => Some(update),
            _ => None,
        })
    }

    pub fn update_count(&self) -> usize {
        self.updates().count()
    }
}

pub struct FeedBatch<'a, R, T, S> {
    validator: &'a FeedValidator<R>,
    tickers: &'a T,
    store: &'a S,
}

impl<'a, R, T, S> FeedBatch<'a, R, T, S>
where
    R: ReportSource,
    T: TickerPriceSource,
    S: FeedIdStore,
{
    pub fn new(validator: &'a FeedValidator<R>, tickers: &'a T, store: &'a S) -> Self {
        Self {
            validator,
            tickers,
            store,
        }
    }

    /// Validate `tokens` at `block_number`, sorted by symbol.
    pub async fn run(&self, tokens: &[TokenConfig], block_number: u64) -> Result<FeedPlan> {
        let run_id = Uuid::new_v4();
        let span = info_span!("feed_batch", %run_id, network = self.validator.network());

        async move {
            let mut tokens: Vec<&TokenConfig> = tokens.iter().collect();
            tokens.sort_by(|a, b| a.symbol.cmp(&b.symbol));

            let ticker_prices = self.tickers.fetch_ticker_prices().await?;
            let mut plan = FeedPlan::default();

            for token in tokens {
                let status = self.check_token(token, block_number, &ticker_prices).await?;
                info!(symbol = %token.symbol, %status, "token checked");
                plan.statuses.push((token.symbol.clone(), status));
            }

            info!(
                tokens = plan.statuses.len(),
                updates = plan.update_count(),
                "🎉 Realtime feed validation complete"
            );
            Ok(plan)
        }
        .instrument(span)
        .await
    }

    async fn check_token(
        &self,
        token: &TokenConfig,
        block_number: u64,
        ticker_prices: &TickerPrices,
    ) -> Result<FeedStatus> {
        let Some(feed_id) = token.realtime_feed_id else {
            info!(symbol = %token.symbol, "skipping token without realtime feed id");
            return Ok(FeedStatus::NotConfigured);
        };

        // Pinned ids are checked before any chain read.
        self.validator.check_expected_feed_id(token, &token.symbol)?;

        let address = token.address.ok_or_else(|| {
            OracleError::MissingField(format!("token {} has no address", token.symbol))
        })?;

        let stored_feed_id: H256 = self.store.stored_feed_id(address).await?;

        let result = self
            .validator
            .validate(ValidationRequest {
                token,
                token_symbol: &token.symbol,
                block_number,
                ticker_prices,
                stored_feed_id,
            })
            .await?;

        Ok(match result.realtime_feed_multiplier {
            Some(multiplier) if result.should_update => FeedStatus::Ready(FeedUpdate {
                symbol: token.symbol.clone(),
                token: address,
                feed_id,
                multiplier,
            }),
            _ => FeedStatus::AlreadyConfigured,
        })
    }
}
