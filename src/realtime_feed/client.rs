//! Realtime feed REST client
//!
//! Fetches signed report blobs from the streaming price provider. Requests
//! are authenticated with an HMAC-SHA256 signature over
//! `"GET <path> <sha256(body)> <client id> <timestamp ms>"`.

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::H256;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

use super::decoder::decode_hex_blob;
use super::ReportSource;
use crate::config::RealtimeFeedConfig;
use crate::error::{OracleError, Result};
use crate::types::RealtimeFeedReport;

pub const TIMESTAMP_HEADER: &str = "x-authorization-timestamp";
pub const SIGNATURE_HEADER: &str = "x-authorization-signature-sha256";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LIMIT: u32 = 20;
const DEFAULT_BLOCK_LOOKBACK: u64 = 10;

/// Provider endpoint for a known network.
pub fn base_url_for_network(network: &str) -> Result<&'static str> {
    match network {
        "arbitrum" => Ok("https://dataengine.chain.link"),
        "arbitrumGoerli" => Ok("https://mercury-arbitrum-testnet.chain.link"),
        other => Err(OracleError::ConfigMismatch(format!(
            "no realtime feed endpoint for network {}",
            other
        ))),
    }
}

/// Hex HMAC-SHA256 request signature.
pub fn sign_request(
    method: &str,
    path: &str,
    body: &str,
    client_id: &str,
    client_secret: &str,
    timestamp_ms: i64,
) -> Result<String> {
    let body_digest = hex::encode(Sha256::digest(body.as_bytes()));
    let message = format!(
        "{} {} {} {} {}",
        method, path, body_digest, client_id, timestamp_ms
    );

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| OracleError::ConfigMismatch(format!("invalid client secret: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
struct ClientBulkResponse {
    #[serde(rename = "chainlinkBlob")]
    chainlink_blob: Vec<String>,
}

pub struct RealtimeFeedClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    limit: u32,
    block_lookback: u64,
}

impl RealtimeFeedClient {
    pub fn new(base_url: &str, client_id: String, client_secret: String) -> Result<Self> {
        Self::with_options(
            base_url,
            client_id,
            client_secret,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_LIMIT,
            DEFAULT_BLOCK_LOOKBACK,
        )
    }

    pub fn with_options(
        base_url: &str,
        client_id: String,
        client_secret: String,
        timeout: Duration,
        limit: u32,
        block_lookback: u64,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            limit,
            block_lookback,
        })
    }

    /// Build from application config; credentials are passed separately so
    /// they never live in the config tree.
    pub fn from_config(
        network: &str,
        config: &RealtimeFeedConfig,
        client_id: String,
        client_secret: String,
    ) -> Result<Self> {
        let base_url = match &config.base_url {
            Some(url) => url.as_str(),
            None => base_url_for_network(network)?,
        };

        Self::with_options(
            base_url,
            client_id,
            client_secret,
            Duration::from_secs(config.timeout_secs),
            config.limit,
            config.block_lookback,
        )
    }

    /// Request path including query string; this is what gets signed.
    pub fn bulk_path(&self, feed_id: H256, block_number: u64) -> String {
        format!(
            "/client/bulk?feedIdHex={:#x}&limit={}&afterBlockNumber={}",
            feed_id,
            self.limit,
            block_number.saturating_sub(self.block_lookback)
        )
    }

    fn auth_headers(&self, path: &str, timestamp_ms: i64) -> Result<HeaderMap> {
        let signature = sign_request(
            "GET",
            path,
            "",
            &self.client_id,
            &self.client_secret,
            timestamp_ms,
        )?;

        let header = |name: &str, value: &str| {
            HeaderValue::from_str(value)
                .map_err(|_| OracleError::ConfigMismatch(format!("invalid {} header value", name)))
        };

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header("Authorization", &self.client_id)?);
        headers.insert(
            TIMESTAMP_HEADER,
            header(TIMESTAMP_HEADER, &timestamp_ms.to_string())?,
        );
        headers.insert(SIGNATURE_HEADER, header(SIGNATURE_HEADER, &signature)?);
        Ok(headers)
    }

    /// Fetch and decode every recent report for `feed_id`, oldest first.
    pub async fn fetch_reports(
        &self,
        feed_id: H256,
        block_number: u64,
    ) -> Result<Vec<RealtimeFeedReport>> {
        let path = self.bulk_path(feed_id, block_number);
        let url = format!("{}{}", self.base_url, path);
        let headers = self.auth_headers(&path, Utc::now().timestamp_millis())?;

        debug!(feed_id = ?feed_id, block_number, "📥 Fetching realtime feed reports");

        let response: ClientBulkResponse = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .chainlink_blob
            .iter()
            .map(|blob| decode_hex_blob(blob).map(|decoded| decoded.report))
            .collect()
    }

    /// Latest report for `feed_id`: the last blob the provider returned.
    pub async fn fetch_latest(&self, feed_id: H256, block_number: u64) -> Result<RealtimeFeedReport> {
        let reports = self.fetch_reports(feed_id, block_number).await?;

        if !is_chronological(&reports) {
            warn!(
                feed_id = ?feed_id,
                count = reports.len(),
                "realtime feed reports are not in ascending observation order, using the last one"
            );
        }

        reports
            .into_iter()
            .last()
            .ok_or(OracleError::EmptyReportSet(feed_id))
    }
}

/// Whether observation timestamps never decrease.
pub fn is_chronological(reports: &[RealtimeFeedReport]) -> bool {
    reports
        .windows(2)
        .all(|pair| pair[0].observation_timestamp <= pair[1].observation_timestamp)
}

#[async_trait]
impl ReportSource for RealtimeFeedClient {
    async fn fetch_latest(&self, feed_id: H256, block_number: u64) -> Result<RealtimeFeedReport> {
        RealtimeFeedClient::fetch_latest(self, feed_id, block_number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_digest_in_signature_input() {
        let digest = hex::encode(Sha256::digest(b""));
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn request_signature_matches_known_vector() {
        let path = "/client/bulk?feedIdHex=0xb43dc495134fa357725f93539511c5a4febeadf56e7c29c96566c825094f0b20&limit=20&afterBlockNumber=150000000";
        let signature = sign_request(
            "GET",
            path,
            "",
            "test-client",
            "test-secret",
            1_700_000_000_000,
        )
        .unwrap();
        assert_eq!(
            signature,
            "4508879621e4663f72240624798e0c90b5630be0bf523f894788731eddf383df"
        );
    }

    #[test]
    fn bulk_path_looks_back_ten_blocks() {
        let client =
            RealtimeFeedClient::new("https://example.test/", "id".into(), "secret".into()).unwrap();
        let feed_id: H256 = "0xb43dc495134fa357725f93539511c5a4febeadf56e7c29c96566c825094f0b20"
            .parse()
            .unwrap();
        assert_eq!(
            client.bulk_path(feed_id, 150_000_010),
            "/client/bulk?feedIdHex=0xb43dc495134fa357725f93539511c5a4febeadf56e7c29c96566c825094f0b20&limit=20&afterBlockNumber=150000000"
        );
    }

    #[test]
    fn unknown_network_needs_explicit_url() {
        assert!(base_url_for_network("arbitrum").is_ok());
        assert!(matches!(
            base_url_for_network("mainnet"),
            Err(OracleError::ConfigMismatch(_))
        ));
    }
}
