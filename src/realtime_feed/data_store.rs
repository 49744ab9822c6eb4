//! On-chain data store reads
//!
//! Reads the realtime feed id already stored for a token, and the chain head
//! used to anchor report fetches.

use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, TransactionRequest, H256};
use ethers::utils::keccak256;

use super::FeedIdStore;
use crate::error::{OracleError, Result};

/// `keccak256(abi.encode(name))`, the data store's key namespace.
pub fn hash_string(name: &str) -> H256 {
    H256::from(keccak256(abi::encode(&[Token::String(name.to_string())])))
}

/// Storage key for a token's realtime feed id.
pub fn realtime_feed_id_key(token: Address) -> H256 {
    H256::from(keccak256(abi::encode(&[
        Token::FixedBytes(hash_string("REALTIME_FEED_ID").as_bytes().to_vec()),
        Token::Address(token),
    ])))
}

/// Calldata for `getBytes32(bytes32)`.
pub fn get_bytes32_calldata(key: H256) -> Bytes {
    let selector = &keccak256("getBytes32(bytes32)")[..4];
    let mut data = selector.to_vec();
    data.extend_from_slice(key.as_bytes());
    Bytes::from(data)
}

pub struct DataStoreReader {
    provider: Provider<Http>,
    data_store: Address,
}

impl DataStoreReader {
    pub fn new(rpc_url: &str, data_store: Address) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| OracleError::Rpc(format!("invalid rpc url {}: {}", rpc_url, e)))?;
        Ok(Self {
            provider,
            data_store,
        })
    }

    pub async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|e| OracleError::Rpc(e.to_string()))
    }
}

#[async_trait]
impl FeedIdStore for DataStoreReader {
    async fn stored_feed_id(&self, token: Address) -> Result<H256> {
        let call = TransactionRequest::new()
            .to(self.data_store)
            .data(get_bytes32_calldata(realtime_feed_id_key(token)));

        let output = self
            .provider
            .call(&call.into(), None)
            .await
            .map_err(|e| OracleError::Rpc(format!("getBytes32 for {:#x}: {}", token, e)))?;

        if output.len() < 32 {
            return Err(OracleError::Decode(format!(
                "getBytes32 returned {} bytes for {:#x}",
                output.len(),
                token
            )));
        }
        Ok(H256::from_slice(&output[..32]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calldata_is_selector_plus_key() {
        let key = H256::repeat_byte(7);
        let data = get_bytes32_calldata(key);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[4..], key.as_bytes());
    }

    #[test]
    fn feed_id_keys_are_per_token() {
        let a = realtime_feed_id_key(Address::repeat_byte(1));
        let b = realtime_feed_id_key(Address::repeat_byte(2));
        assert_ne!(a, b);
        assert_ne!(a, H256::zero());
    }
}
