//! Price attestation signing
//!
//! Each signer attests to `(salt, block number, block hash, token, price)`
//! with a personal-message signature over the keccak256 digest of the
//! tightly packed tuple, so the verifier can recover the signer directly.

use ethers::signers::Signer;
use ethers::types::{Address, RecoveryMessage, Signature, H256, U256};
use ethers::utils::keccak256;
use tracing::debug;

use crate::compaction::{BLOCK_NUMBER_LANES, PRICE_LANES};
use crate::error::{OracleError, Result};

/// Packed message length: salt, block number, block hash, token, price.
pub const PRICE_MESSAGE_LEN: usize = 32 + 32 + 32 + 20 + 32;

/// Tight packing of the attested tuple.
///
/// Integers keep their full uint256 width; the address is 20 bytes.
pub fn price_message(
    salt: H256,
    block_number: U256,
    block_hash: H256,
    token: Address,
    price: U256,
) -> Vec<u8> {
    let mut word = [0u8; 32];
    let mut message = Vec::with_capacity(PRICE_MESSAGE_LEN);

    message.extend_from_slice(salt.as_bytes());
    block_number.to_big_endian(&mut word);
    message.extend_from_slice(&word);
    message.extend_from_slice(block_hash.as_bytes());
    message.extend_from_slice(token.as_bytes());
    price.to_big_endian(&mut word);
    message.extend_from_slice(&word);

    message
}

pub fn price_digest(
    salt: H256,
    block_number: U256,
    block_hash: H256,
    token: Address,
    price: U256,
) -> H256 {
    H256::from(keccak256(price_message(
        salt,
        block_number,
        block_hash,
        token,
        price,
    )))
}

/// Sign one price observation.
pub async fn sign_one<S: Signer>(
    signer: &S,
    salt: H256,
    block_number: U256,
    block_hash: H256,
    token: Address,
    price: U256,
) -> Result<Signature> {
    PRICE_LANES.check(price)?;
    BLOCK_NUMBER_LANES.check(block_number)?;

    let digest = price_digest(salt, block_number, block_hash, token, price);
    let signature = signer
        .sign_message(digest.as_bytes())
        .await
        .map_err(|e| OracleError::Signing(format!("{} for token {:#x}", e, token)))?;

    debug!(
        signer = %format!("{:#x}", signer.address()),
        token = %format!("{:#x}", token),
        %price,
        %block_number,
        "signed price"
    );

    Ok(signature)
}

/// Sign the same observation with every signer; `prices[j]` is attested by
/// `signers[j]`. Signatures come back in signer order.
pub async fn sign_many<S: Signer>(
    signers: &[S],
    salt: H256,
    block_number: U256,
    block_hash: H256,
    token: Address,
    prices: &[U256],
) -> Result<Vec<Signature>> {
    if prices.len() != signers.len() {
        return Err(OracleError::LengthMismatch {
            field: "prices",
            expected: signers.len(),
            actual: prices.len(),
        });
    }

    let mut signatures = Vec::with_capacity(signers.len());
    for (signer, price) in signers.iter().zip(prices) {
        signatures.push(sign_one(signer, salt, block_number, block_hash, token, *price).await?);
    }
    Ok(signatures)
}

/// Recover the address that signed `digest`.
pub fn recover_signer(digest: H256, signature: &Signature) -> Result<Address> {
    signature
        .recover(RecoveryMessage::Data(digest.as_bytes().to_vec()))
        .map_err(|e| OracleError::Signing(e.to_string()))
}
