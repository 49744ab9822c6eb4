//! Oracle params builder
//!
//! Signs every (token, signer) pair and compacts the results into an
//! [`OracleSubmission`]. Signatures and flattened prices are emitted by the
//! same token-major, signer-minor loop: the verifier pairs them by position.

use ethers::signers::Signer;
use ethers::types::{Address, Bytes, H256, U256};
use tracing::info;

use crate::compaction::{compact_oracle_block_numbers, compact_prices, pack_signer_info};
use crate::error::{OracleError, Result};
use crate::signing::sign_one;
use crate::types::OracleSubmission;

/// Per-token observations to attest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleParams {
    pub salt: H256,
    pub block_numbers: Vec<U256>,
    pub block_hashes: Vec<H256>,
    pub signer_indexes: Vec<u64>,
    pub tokens: Vec<Address>,
    pub prices: Vec<U256>,
    pub price_feed_tokens: Vec<Address>,
}

impl OracleParams {
    fn check_lengths(&self, signer_count: usize) -> Result<()> {
        let tokens = self.tokens.len();
        let checks = [
            ("block numbers", tokens, self.block_numbers.len()),
            ("block hashes", tokens, self.block_hashes.len()),
            ("prices", tokens, self.prices.len()),
            ("signer indexes", signer_count, self.signer_indexes.len()),
        ];

        for (field, expected, actual) in checks {
            if expected != actual {
                return Err(OracleError::LengthMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

pub struct OracleParamsBuilder<'a, S> {
    signers: &'a [S],
}

impl<'a, S: Signer> OracleParamsBuilder<'a, S> {
    pub fn new(signers: &'a [S]) -> Self {
        Self { signers }
    }

    pub async fn build(&self, params: &OracleParams) -> Result<OracleSubmission> {
        params.check_lengths(self.signers.len())?;

        let signer_info = pack_signer_info(&params.signer_indexes)?;

        let pairs = params.tokens.len() * self.signers.len();
        let mut all_prices = Vec::with_capacity(pairs);
        let mut signatures = Vec::with_capacity(pairs);

        for (i, token) in params.tokens.iter().enumerate() {
            let price = params.prices[i];
            for signer in self.signers {
                let signature = sign_one(
                    signer,
                    params.salt,
                    params.block_numbers[i],
                    params.block_hashes[i],
                    *token,
                    price,
                )
                .await?;
                signatures.push(Bytes::from(signature.to_vec()));
                all_prices.push(price);
            }
        }

        let submission = OracleSubmission {
            price_feed_tokens: params.price_feed_tokens.clone(),
            signer_info,
            tokens: params.tokens.clone(),
            compacted_oracle_block_numbers: compact_oracle_block_numbers(&params.block_numbers)?,
            compacted_prices: compact_prices(&all_prices)?,
            signatures,
        };

        info!(
            tokens = submission.tokens.len(),
            signers = self.signers.len(),
            signatures = submission.signatures.len(),
            price_words = submission.compacted_prices.len(),
            "✅ Oracle params built"
        );

        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::LocalWallet;

    #[tokio::test]
    async fn rejects_misaligned_inputs() {
        let wallet: LocalWallet =
            "0x59c6995e998f97a5a0044966f0945387dc9f5a59e86cdc84e64546a1d8f76d59"
                .parse()
                .unwrap();
        let signers = [wallet];
        let params = OracleParams {
            signer_indexes: vec![0],
            tokens: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            prices: vec![U256::from(1), U256::from(2)],
            block_numbers: vec![U256::from(10)],
            block_hashes: vec![H256::zero(), H256::zero()],
            ..Default::default()
        };

        let err = OracleParamsBuilder::new(&signers)
            .build(&params)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OracleError::LengthMismatch {
                field: "block numbers",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn no_tokens_yields_empty_bundle() {
        let signers: [LocalWallet; 0] = [];
        let submission = OracleParamsBuilder::new(&signers)
            .build(&OracleParams::default())
            .await
            .unwrap();
        assert_eq!(submission.signer_info, U256::zero());
        assert!(submission.signatures.is_empty());
        assert!(submission.compacted_prices.is_empty());
    }
}
