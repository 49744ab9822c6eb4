//! Build a signed oracle price bundle
//!
//! Usage: cargo run --bin build_oracle_params -- <request.yaml>
//!
//! Signer private keys are read from ORACLE_SIGNER_KEYS (comma-separated, in
//! signer index order). The bundle is printed as JSON.

use anyhow::{anyhow, bail, Context, Result};
use ethers::signers::LocalWallet;
use ethers::types::{Address, H256, U256};
use serde::Deserialize;
use std::fs;
use tracing::info;

use oracle_tools::oracle::{OracleParams, OracleParamsBuilder};

#[derive(Debug, Deserialize)]
struct TokenPrice {
    address: Address,
    /// Decimal string
    price: String,
    /// Decimal string
    block_number: String,
    block_hash: H256,
}

#[derive(Debug, Deserialize)]
struct ParamsRequest {
    #[serde(default)]
    salt: Option<H256>,
    signer_indexes: Vec<u64>,
    tokens: Vec<TokenPrice>,
    #[serde(default)]
    price_feed_tokens: Vec<Address>,
}

fn parse_uint(field: &str, raw: &str) -> Result<U256> {
    U256::from_dec_str(raw.trim()).map_err(|e| anyhow!("Invalid {} '{}': {}", field, raw, e))
}

impl ParamsRequest {
    fn into_params(self) -> Result<OracleParams> {
        let mut params = OracleParams {
            salt: self.salt.unwrap_or_else(|| H256::from(rand::random::<[u8; 32]>())),
            signer_indexes: self.signer_indexes,
            price_feed_tokens: self.price_feed_tokens,
            ..Default::default()
        };

        for token in self.tokens {
            params.tokens.push(token.address);
            params.prices.push(parse_uint("price", &token.price)?);
            params
                .block_numbers
                .push(parse_uint("block number", &token.block_number)?);
            params.block_hashes.push(token.block_hash);
        }
        Ok(params)
    }
}

fn load_signers() -> Result<Vec<LocalWallet>> {
    let raw = std::env::var("ORACLE_SIGNER_KEYS")
        .context("Required environment variable ORACLE_SIGNER_KEYS is not set")?;

    let signers = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .enumerate()
        .map(|(i, key)| {
            key.parse::<LocalWallet>()
                .with_context(|| format!("Invalid private key for signer {}", i))
        })
        .collect::<Result<Vec<_>>>()?;

    if signers.is_empty() {
        bail!("ORACLE_SIGNER_KEYS contains no keys");
    }
    Ok(signers)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    oracle_tools::init_tracing();

    let path = std::env::args()
        .nth(1)
        .context("Usage: build_oracle_params <request.yaml>")?;
    let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let request: ParamsRequest =
        serde_yaml::from_str(&raw).with_context(|| format!("Failed to parse {}", path))?;

    let params = request.into_params()?;
    let signers = load_signers()?;
    info!(
        tokens = params.tokens.len(),
        signers = signers.len(),
        salt = %format!("{:#x}", params.salt),
        "🔏 Signing oracle prices"
    );

    let submission = OracleParamsBuilder::new(&signers)
        .build(&params)
        .await
        .context("Failed to build oracle params")?;

    println!("{}", serde_json::to_string_pretty(&submission)?);
    Ok(())
}
