//! Realtime feed validation
//!
//! Decides whether a token's realtime feed is safe to configure. The latest
//! report must be internally tight (min/max spread) and agree with the ticker
//! service, and any feed id already stored on chain must match the config.
//!
//! Check order is fixed: spreads are evaluated before the stored feed id, so
//! an already-configured token still fails on a bad report.

use ethers::types::{H256, I256, U256};
use std::collections::HashMap;
use tracing::{debug, info};

use super::ReportSource;
use crate::error::{OracleError, Result};
use crate::types::{ticker_key, ExpectedFeedId, TickerPrices, TokenConfig, ValidationResult};

/// Token decimals plus feed decimals plus the multiplier exponent.
pub const PRICE_DECIMALS_BUDGET: u8 = 60;

pub const MAX_SPREAD_BPS: u64 = 50;

const BASIS_POINTS_DIVISOR: u64 = 10_000;

/// Decimals of the 30-decimal price precision the multiplier scales into.
const FLOAT_PRECISION_DECIMALS: usize = 30;

pub struct ValidationRequest<'a> {
    pub token: &'a TokenConfig,
    pub token_symbol: &'a str,
    pub block_number: u64,
    pub ticker_prices: &'a TickerPrices,
    /// Zero when nothing is stored yet.
    pub stored_feed_id: H256,
}

#[derive(Debug, Clone, Copy)]
struct PriceSet {
    min: U256,
    max: U256,
    median: U256,
}

pub struct FeedValidator<R> {
    reports: R,
    network: String,
    expected_feed_ids: HashMap<String, H256>,
}

impl<R: ReportSource> FeedValidator<R> {
    /// `expected_feed_ids` may cover several networks; only entries for
    /// `network` are kept.
    pub fn new(
        reports: R,
        network: &str,
        expected_feed_ids: impl IntoIterator<Item = ExpectedFeedId>,
    ) -> Self {
        let expected_feed_ids = expected_feed_ids
            .into_iter()
            .filter(|e| e.network == network)
            .map(|e| (e.symbol, e.feed_id))
            .collect();

        Self {
            reports,
            network: network.to_string(),
            expected_feed_ids,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Fails when a feed id is pinned for `symbol` on this network and the
    /// token is configured with a different one.
    pub fn check_expected_feed_id(&self, token: &TokenConfig, symbol: &str) -> Result<()> {
        match self.expected_feed_ids.get(symbol) {
            Some(expected) if token.realtime_feed_id != Some(*expected) => {
                Err(OracleError::ConfigMismatch(format!(
                    "{} on {}: expected realtime feed id {:#x}, configured {:?}",
                    symbol, self.network, expected, token.realtime_feed_id
                )))
            }
            _ => Ok(()),
        }
    }

    pub async fn validate(&self, request: ValidationRequest<'_>) -> Result<ValidationResult> {
        let ValidationRequest {
            token,
            token_symbol: symbol,
            block_number,
            ticker_prices,
            stored_feed_id,
        } = request;

        self.check_expected_feed_id(token, symbol)?;

        let address = token
            .address
            .ok_or_else(|| OracleError::MissingField(format!("token {} has no address", symbol)))?;
        let decimals = token
            .decimals
            .ok_or_else(|| OracleError::MissingField(format!("token {} has no decimals", symbol)))?;
        let feed_decimals = token.realtime_feed_decimals.ok_or_else(|| {
            OracleError::MissingField(format!("token {} has no realtimeFeedDecimals", symbol))
        })?;
        let feed_id = token.realtime_feed_id.ok_or_else(|| {
            OracleError::MissingField(format!("token {} has no realtimeFeedId", symbol))
        })?;

        let multiplier = realtime_feed_multiplier(symbol, decimals, feed_decimals)?;

        let report = self.reports.fetch_latest(feed_id, block_number).await?;
        if report.feed_id != feed_id {
            return Err(OracleError::InvalidReport {
                feed_id,
                reason: format!("report is for feed {:#x}", report.feed_id),
            });
        }

        let raw = PriceSet {
            min: positive(report.min_price, feed_id, "min price")?,
            max: positive(report.max_price, feed_id, "max price")?,
            median: positive(report.median_price, feed_id, "median price")?,
        };

        let token_unit = U256::exp10(decimals as usize);
        let price_per_unit = raw.try_map(|p| {
            checked_mul(p, multiplier, "scaling report price")
                .map(|v| v / U256::exp10(FLOAT_PRECISION_DECIMALS))
        })?;
        let price_per_token =
            price_per_unit.try_map(|p| checked_mul(p, token_unit, "scaling price per token"))?;

        let ticker = ticker_prices.get(&ticker_key(&address)).ok_or_else(|| {
            OracleError::MissingField(format!(
                "no ticker price for {} {:#x}",
                symbol, address
            ))
        })?;
        let ticker_min = checked_mul(ticker.min, token_unit, "scaling ticker min price")?;
        let ticker_max = checked_mul(ticker.max, token_unit, "scaling ticker max price")?;

        debug!(
            symbol,
            min = %price_per_token.min,
            max = %price_per_token.max,
            median = %price_per_token.median,
            ticker_min = %ticker_min,
            ticker_max = %ticker_max,
            "realtime feed prices per token"
        );

        let min_max_spread = spread_bps(
            price_per_unit.max.saturating_sub(price_per_unit.min),
            price_per_unit.min,
            feed_id,
        )?;
        check_spread(symbol, "min/max", min_max_spread)?;

        let ticker_diff = abs_diff(price_per_token.min, ticker_min);
        let ticker_spread_min = spread_bps(ticker_diff, ticker_min, feed_id)?;
        check_spread(symbol, "ticker min", ticker_spread_min)?;

        // Numerator is the min-price difference for both ticker checks.
        let ticker_spread_max = spread_bps(ticker_diff, ticker_max, feed_id)?;
        check_spread(symbol, "ticker max", ticker_spread_max)?;

        info!(
            symbol,
            feed_id = %format!("{:#x}", feed_id),
            %min_max_spread,
            %ticker_spread_min,
            %ticker_spread_max,
            observation_timestamp = report.observation_timestamp,
            "✅ Realtime feed report within tolerance"
        );

        if !stored_feed_id.is_zero() {
            if stored_feed_id == feed_id {
                info!(symbol, "stored realtime feed id already matches the config");
                return Ok(ValidationResult::skipped());
            }
            return Err(OracleError::ConfigMismatch(format!(
                "{}: stored realtime feed id {:#x} does not match configured {:#x}",
                symbol, stored_feed_id, feed_id
            )));
        }

        Ok(ValidationResult::ready(multiplier))
    }
}

impl PriceSet {
    fn try_map(self, f: impl Fn(U256) -> Result<U256>) -> Result<PriceSet> {
        Ok(PriceSet {
            min: f(self.min)?,
            max: f(self.max)?,
            median: f(self.median)?,
        })
    }
}

/// `10^(60 - token decimals - feed decimals)`.
pub fn realtime_feed_multiplier(symbol: &str, decimals: u8, feed_decimals: u8) -> Result<U256> {
    let used = decimals as u16 + feed_decimals as u16;
    if used > PRICE_DECIMALS_BUDGET as u16 {
        return Err(OracleError::DecimalsOutOfRange {
            symbol: symbol.to_string(),
            token_decimals: decimals,
            feed_decimals,
        });
    }
    Ok(U256::exp10((PRICE_DECIMALS_BUDGET as u16 - used) as usize))
}

fn positive(price: I256, feed_id: H256, field: &str) -> Result<U256> {
    if !price.is_positive() {
        return Err(OracleError::InvalidReport {
            feed_id,
            reason: format!("{} is not positive: {}", field, price),
        });
    }
    Ok(price.into_raw())
}

fn checked_mul(a: U256, b: U256, context: &str) -> Result<U256> {
    a.checked_mul(b)
        .ok_or_else(|| OracleError::Arithmetic(format!("{} ({} * {})", context, a, b)))
}

fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

fn spread_bps(diff: U256, base: U256, feed_id: H256) -> Result<U256> {
    if base.is_zero() {
        return Err(OracleError::InvalidReport {
            feed_id,
            reason: "spread base price is zero".to_string(),
        });
    }
    Ok(checked_mul(diff, U256::from(BASIS_POINTS_DIVISOR), "computing spread")? / base)
}

fn check_spread(symbol: &str, check: &'static str, spread: U256) -> Result<()> {
    if spread > U256::from(MAX_SPREAD_BPS) {
        return Err(OracleError::SpreadTolerance {
            symbol: symbol.to_string(),
            check,
            spread_bps: spread,
            max_bps: MAX_SPREAD_BPS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime_feed::MockReportSource;
    use crate::types::{RealtimeFeedReport, TickerPrice};
    use ethers::types::{Address, Bytes};

    const FEED_DECIMALS: u8 = 8;
    const TOKEN_DECIMALS: u8 = 18;

    fn feed_id() -> H256 {
        H256::repeat_byte(0xfe)
    }

    fn token() -> TokenConfig {
        TokenConfig {
            symbol: "ETH".into(),
            address: Some(Address::repeat_byte(0xaa)),
            decimals: Some(TOKEN_DECIMALS),
            realtime_feed_id: Some(feed_id()),
            realtime_feed_decimals: Some(FEED_DECIMALS),
        }
    }

    /// Feed price with 8 decimals, e.g. `cents(10_060)` is 100.60.
    fn cents(v: u64) -> I256 {
        I256::from_raw(U256::from(v) * U256::exp10(6))
    }

    fn report(min: I256, median: I256, max: I256) -> RealtimeFeedReport {
        RealtimeFeedReport {
            feed_id: feed_id(),
            observation_timestamp: 1_700_000_000,
            median_price: median,
            min_price: min,
            max_price: max,
            min_block_number: 100,
            max_block_number: 110,
            max_block_hash: H256::repeat_byte(0xbb),
            max_block_timestamp: 1_700_000_001,
            blob: Bytes::default(),
        }
    }

    /// Ticker quote per unit for a USD price given in cents.
    fn ticker_cents(min: u64, max: u64) -> TickerPrices {
        let per_unit = |c: u64| U256::from(c) * U256::exp10(30 - TOKEN_DECIMALS as usize - 2);
        let mut prices = TickerPrices::new();
        prices.insert(
            ticker_key(&Address::repeat_byte(0xaa)),
            TickerPrice {
                min: per_unit(min),
                max: per_unit(max),
            },
        );
        prices
    }

    fn validator(report: RealtimeFeedReport) -> FeedValidator<MockReportSource> {
        let mut source = MockReportSource::new();
        source
            .expect_fetch_latest()
            .returning(move |_, _| Ok(report.clone()));
        FeedValidator::new(source, "arbitrum", Vec::new())
    }

    fn request<'a>(token: &'a TokenConfig, tickers: &'a TickerPrices, stored: H256) -> ValidationRequest<'a> {
        ValidationRequest {
            token,
            token_symbol: "ETH",
            block_number: 120,
            ticker_prices: tickers,
            stored_feed_id: stored,
        }
    }

    #[tokio::test]
    async fn tight_report_is_ready_with_multiplier() {
        let v = validator(report(cents(10_000), cents(10_000), cents(10_010)));
        let tickers = ticker_cents(10_000, 10_010);
        let token = token();

        let result = v.validate(request(&token, &tickers, H256::zero())).await.unwrap();
        assert_eq!(result, ValidationResult::ready(U256::exp10(34)));
    }

    #[tokio::test]
    async fn sixty_bps_min_max_spread_is_rejected() {
        let v = validator(report(cents(10_000), cents(10_030), cents(10_060)));
        let tickers = ticker_cents(10_000, 10_060);
        let token = token();

        let err = v.validate(request(&token, &tickers, H256::zero())).await.unwrap_err();
        match err {
            OracleError::SpreadTolerance { check, spread_bps, .. } => {
                assert_eq!(check, "min/max");
                assert_eq!(spread_bps, U256::from(60));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fifty_bps_spread_is_accepted() {
        let v = validator(report(cents(10_000), cents(10_025), cents(10_050)));
        let tickers = ticker_cents(10_000, 10_050);
        let token = token();

        assert!(v.validate(request(&token, &tickers, H256::zero())).await.is_ok());
    }

    #[tokio::test]
    async fn ticker_divergence_is_rejected() {
        let v = validator(report(cents(10_000), cents(10_000), cents(10_000)));
        let tickers = ticker_cents(10_100, 10_100);
        let token = token();

        let err = v.validate(request(&token, &tickers, H256::zero())).await.unwrap_err();
        assert!(matches!(
            err,
            OracleError::SpreadTolerance { check: "ticker min", .. }
        ));
    }

    #[tokio::test]
    async fn ticker_max_check_uses_min_price_difference() {
        // Ticker max is 1% above the report; only the min difference counts.
        let v = validator(report(cents(10_000), cents(10_000), cents(10_000)));
        let tickers = ticker_cents(10_000, 10_100);
        let token = token();

        assert!(v.validate(request(&token, &tickers, H256::zero())).await.is_ok());
    }

    #[tokio::test]
    async fn ticker_max_below_ticker_min_is_rejected() {
        // 50 cents off a 100.50 min is 49 bps; over a 90.00 max it is 55 bps.
        let v = validator(report(cents(10_000), cents(10_000), cents(10_000)));
        let tickers = ticker_cents(10_050, 9_000);
        let token = token();

        let err = v.validate(request(&token, &tickers, H256::zero())).await.unwrap_err();
        match err {
            OracleError::SpreadTolerance { check, spread_bps, .. } => {
                assert_eq!(check, "ticker max");
                assert_eq!(spread_bps, U256::from(55));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn spread_failure_is_not_masked_by_matching_stored_id() {
        let v = validator(report(cents(10_000), cents(10_030), cents(10_060)));
        let tickers = ticker_cents(10_000, 10_060);
        let token = token();

        let err = v.validate(request(&token, &tickers, feed_id())).await.unwrap_err();
        assert!(matches!(err, OracleError::SpreadTolerance { .. }));
    }

    #[tokio::test]
    async fn matching_stored_id_is_skipped() {
        let v = validator(report(cents(10_000), cents(10_000), cents(10_000)));
        let tickers = ticker_cents(10_000, 10_000);
        let token = token();

        let result = v.validate(request(&token, &tickers, feed_id())).await.unwrap();
        assert_eq!(result, ValidationResult::skipped());
    }

    #[tokio::test]
    async fn different_stored_id_is_a_mismatch() {
        let v = validator(report(cents(10_000), cents(10_000), cents(10_000)));
        let tickers = ticker_cents(10_000, 10_000);
        let token = token();

        let err = v
            .validate(request(&token, &tickers, H256::repeat_byte(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::ConfigMismatch(_)));
    }

    #[tokio::test]
    async fn expected_feed_id_mismatch_fails_before_fetch() {
        let mut source = MockReportSource::new();
        source.expect_fetch_latest().never();
        let expected = ExpectedFeedId {
            network: "arbitrum".into(),
            symbol: "ETH".into(),
            feed_id: H256::repeat_byte(0x01),
        };
        let v = FeedValidator::new(source, "arbitrum", vec![expected]);
        let tickers = ticker_cents(10_000, 10_000);
        let token = token();

        let err = v.validate(request(&token, &tickers, H256::zero())).await.unwrap_err();
        assert!(matches!(err, OracleError::ConfigMismatch(_)));
    }

    #[tokio::test]
    async fn expected_feed_ids_for_other_networks_are_ignored() {
        let mut source = MockReportSource::new();
        let r = report(cents(10_000), cents(10_000), cents(10_000));
        source.expect_fetch_latest().returning(move |_, _| Ok(r.clone()));
        let expected = ExpectedFeedId {
            network: "avalanche".into(),
            symbol: "ETH".into(),
            feed_id: H256::repeat_byte(0x01),
        };
        let v = FeedValidator::new(source, "arbitrum", vec![expected]);
        let tickers = ticker_cents(10_000, 10_000);
        let token = token();

        assert!(v.validate(request(&token, &tickers, H256::zero())).await.is_ok());
    }

    #[tokio::test]
    async fn missing_metadata_and_ticker_are_reported() {
        let v = validator(report(cents(10_000), cents(10_000), cents(10_000)));
        let tickers = ticker_cents(10_000, 10_000);

        let mut no_decimals = token();
        no_decimals.realtime_feed_decimals = None;
        let err = v
            .validate(request(&no_decimals, &tickers, H256::zero()))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::MissingField(_)));

        let token = token();
        let empty = TickerPrices::new();
        let err = v.validate(request(&token, &empty, H256::zero())).await.unwrap_err();
        assert!(matches!(err, OracleError::MissingField(_)));
    }

    #[tokio::test]
    async fn non_positive_report_price_is_invalid() {
        let v = validator(report(I256::zero(), cents(10_000), cents(10_000)));
        let tickers = ticker_cents(10_000, 10_000);
        let token = token();

        let err = v.validate(request(&token, &tickers, H256::zero())).await.unwrap_err();
        assert!(matches!(err, OracleError::InvalidReport { .. }));
    }

    #[test]
    fn multiplier_respects_decimals_budget() {
        assert_eq!(realtime_feed_multiplier("ETH", 18, 8).unwrap(), U256::exp10(34));
        assert_eq!(realtime_feed_multiplier("X", 30, 30).unwrap(), U256::one());
        assert!(matches!(
            realtime_feed_multiplier("X", 40, 21),
            Err(OracleError::DecimalsOutOfRange { .. })
        ));
    }
}
