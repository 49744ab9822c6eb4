//! Realtime feed report decoding
//!
//! Outer envelope: `(bytes32[3] reportContext, bytes reportData, bytes32[] rs,
//! bytes32[] ss, bytes32 rawVs)`.
//!
//! Inner report: `(bytes32 feedId, uint32 observationTimestamp, int192 median,
//! int192 min, int192 max, uint64 maxBlockNumber, bytes32 maxBlockHash,
//! uint64 minBlockNumber, uint64 maxBlockTimestamp)`.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Bytes, H256, I256, U256};

use crate::error::{OracleError, Result};
use crate::types::{DecodedBlob, RealtimeFeedReport};

/// Width of the signed report price fields.
const PRICE_BITS: usize = 192;

fn envelope_types() -> Vec<ParamType> {
    vec![
        ParamType::FixedArray(Box::new(ParamType::FixedBytes(32)), 3),
        ParamType::Bytes,
        ParamType::Array(Box::new(ParamType::FixedBytes(32))),
        ParamType::Array(Box::new(ParamType::FixedBytes(32))),
        ParamType::FixedBytes(32),
    ]
}

fn report_types() -> Vec<ParamType> {
    vec![
        ParamType::FixedBytes(32), // feed id
        ParamType::Uint(32),       // observation timestamp
        ParamType::Int(PRICE_BITS), // median
        ParamType::Int(PRICE_BITS), // bid
        ParamType::Int(PRICE_BITS), // ask
        ParamType::Uint(64),       // max block number
        ParamType::FixedBytes(32), // max block hash
        ParamType::Uint(64),       // min block number
        ParamType::Uint(64),       // max block timestamp
    ]
}

/// Cursor over decoded tokens that names the field on every mismatch.
struct Fields<I> {
    tokens: I,
}

impl<I: Iterator<Item = Token>> Fields<I> {
    fn next(&mut self, field: &str) -> Result<Token> {
        self.tokens
            .next()
            .ok_or_else(|| OracleError::Decode(format!("missing {}", field)))
    }

    fn word(&mut self, field: &str) -> Result<H256> {
        to_word(self.next(field)?, field)
    }

    fn words(&mut self, field: &str) -> Result<Vec<H256>> {
        match self.next(field)? {
            Token::Array(items) | Token::FixedArray(items) => {
                items.into_iter().map(|t| to_word(t, field)).collect()
            }
            other => Err(unexpected(field, &other)),
        }
    }

    fn bytes(&mut self, field: &str) -> Result<Vec<u8>> {
        match self.next(field)? {
            Token::Bytes(bytes) => Ok(bytes),
            other => Err(unexpected(field, &other)),
        }
    }

    fn uint(&mut self, field: &str, max: u64) -> Result<u64> {
        match self.next(field)? {
            Token::Uint(value) if value <= U256::from(max) => Ok(value.low_u64()),
            Token::Uint(value) => Err(OracleError::Decode(format!(
                "{} out of range: {}",
                field, value
            ))),
            other => Err(unexpected(field, &other)),
        }
    }

    /// Signed `bits`-wide integer: every bit above the sign bit must copy it.
    fn int(&mut self, field: &str, bits: usize) -> Result<I256> {
        match self.next(field)? {
            Token::Int(raw) => {
                let high = raw >> (bits - 1);
                if high.is_zero() || high == U256::MAX >> (bits - 1) {
                    Ok(I256::from_raw(raw))
                } else {
                    Err(OracleError::Decode(format!(
                        "{} is not a valid int{}: {:#x}",
                        field, bits, raw
                    )))
                }
            }
            other => Err(unexpected(field, &other)),
        }
    }
}

fn to_word(token: Token, field: &str) -> Result<H256> {
    match token {
        Token::FixedBytes(bytes) if bytes.len() == 32 => Ok(H256::from_slice(&bytes)),
        other => Err(unexpected(field, &other)),
    }
}

fn unexpected(field: &str, token: &Token) -> OracleError {
    OracleError::Decode(format!("unexpected token for {}: {:?}", field, token))
}

/// Decode a report blob into its envelope and report.
pub fn decode_blob(blob: &[u8]) -> Result<DecodedBlob> {
    let mut outer = Fields {
        tokens: abi::decode(&envelope_types(), blob)?.into_iter(),
    };

    let context = outer.words("report context")?;
    let report_context: [H256; 3] = context.try_into().map_err(|words: Vec<H256>| {
        OracleError::Decode(format!("report context has {} words", words.len()))
    })?;
    let report_data = outer.bytes("report data")?;
    let rs = outer.words("rs")?;
    let ss = outer.words("ss")?;
    let raw_vs = outer.word("raw vs")?;

    let mut inner = Fields {
        tokens: abi::decode(&report_types(), &report_data)?.into_iter(),
    };

    let feed_id = inner.word("feed id")?;
    let observation_timestamp = inner.uint("observation timestamp", u32::MAX as u64)? as u32;
    let median_price = inner.int("median price", PRICE_BITS)?;
    let min_price = inner.int("min price", PRICE_BITS)?;
    let max_price = inner.int("max price", PRICE_BITS)?;
    let max_block_number = inner.uint("max block number", u64::MAX)?;
    let max_block_hash = inner.word("max block hash")?;
    let min_block_number = inner.uint("min block number", u64::MAX)?;
    let max_block_timestamp = inner.uint("max block timestamp", u64::MAX)?;

    Ok(DecodedBlob {
        report_context,
        report: RealtimeFeedReport {
            feed_id,
            observation_timestamp,
            median_price,
            min_price,
            max_price,
            min_block_number,
            max_block_number,
            max_block_hash,
            max_block_timestamp,
            blob: Bytes::from(blob.to_vec()),
        },
        rs,
        ss,
        raw_vs,
    })
}

/// Decode a `0x`-prefixed hex blob as returned by the provider.
pub fn decode_hex_blob(blob: &str) -> Result<DecodedBlob> {
    let raw = hex::decode(blob.trim().trim_start_matches("0x"))?;
    decode_blob(&raw)
}

/// ABI-encode an envelope. Produces blobs in the provider's wire format,
/// used for fixtures and for re-emitting audited reports.
pub fn encode_blob(decoded: &DecodedBlob) -> Bytes {
    let report = &decoded.report;
    let word = |h: &H256| Token::FixedBytes(h.as_bytes().to_vec());

    let report_data = abi::encode(&[
        word(&report.feed_id),
        Token::Uint(U256::from(report.observation_timestamp)),
        Token::Int(report.median_price.into_raw()),
        Token::Int(report.min_price.into_raw()),
        Token::Int(report.max_price.into_raw()),
        Token::Uint(U256::from(report.max_block_number)),
        word(&report.max_block_hash),
        Token::Uint(U256::from(report.min_block_number)),
        Token::Uint(U256::from(report.max_block_timestamp)),
    ]);

    Bytes::from(abi::encode(&[
        Token::FixedArray(decoded.report_context.iter().map(word).collect()),
        Token::Bytes(report_data),
        Token::Array(decoded.rs.iter().map(word).collect()),
        Token::Array(decoded.ss.iter().map(word).collect()),
        word(&decoded.raw_vs),
    ]))
}
