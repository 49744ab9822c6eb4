//! Parameter compaction
//!
//! Packs bounded-width unsigned integers into 256-bit words for the oracle
//! verifier, and mirrors the verifier's lane decoding.
//!
//! Lane `j` of word `i` holds the value at flat index `i * lanes_per_word + j`,
//! lane 0 occupying the least significant bits.

use ethers::types::U256;

use crate::error::{OracleError, Result};

pub const WORD_BITS: usize = 256;
pub const SIGNER_INDEX_BITS: usize = 16;

/// Largest signer index the verifier accepts.
pub const MAX_SIGNER_INDEX: u64 = u8::MAX as u64;

/// Signer info reserves lane 0 for the count, leaving 15 index lanes.
pub const MAX_SIGNERS: usize = WORD_BITS / SIGNER_INDEX_BITS - 1;

/// Fixed lane layout for one compacted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneLayout {
    field: &'static str,
    bit_width: usize,
    max_value: U256,
}

pub const PRICE_LANES: LaneLayout = LaneLayout {
    field: "price",
    bit_width: 32,
    max_value: U256([u32::MAX as u64, 0, 0, 0]),
};

pub const BLOCK_NUMBER_LANES: LaneLayout = LaneLayout {
    field: "oracle block number",
    bit_width: 64,
    max_value: U256([u64::MAX, 0, 0, 0]),
};

impl LaneLayout {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn bit_width(&self) -> usize {
        self.bit_width
    }

    pub fn max_value(&self) -> U256 {
        self.max_value
    }

    pub fn lanes_per_word(&self) -> usize {
        WORD_BITS / self.bit_width
    }

    /// Number of words needed for `count` values.
    pub fn words_for(&self, count: usize) -> usize {
        count.div_ceil(self.lanes_per_word())
    }

    /// Fails with `FieldOverflow` if `value` does not fit a lane.
    pub fn check(&self, value: U256) -> Result<()> {
        if value > self.max_value {
            return Err(OracleError::overflow(self.field, value, self.max_value));
        }
        Ok(())
    }
}

/// Pack `values` into `ceil(len / lanes_per_word)` words.
///
/// Every value is range-checked before any packing happens, so an oversized
/// value yields no partial output.
pub fn compact(values: &[U256], layout: &LaneLayout) -> Result<Vec<U256>> {
    for value in values {
        layout.check(*value)?;
    }

    let lanes = layout.lanes_per_word();
    let words = values
        .chunks(lanes)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(U256::zero(), |word, (j, value)| {
                    word | (*value << (j * layout.bit_width))
                })
        })
        .collect();

    Ok(words)
}

pub fn compact_prices(prices: &[U256]) -> Result<Vec<U256>> {
    compact(prices, &PRICE_LANES)
}

pub fn compact_oracle_block_numbers(block_numbers: &[U256]) -> Result<Vec<U256>> {
    compact(block_numbers, &BLOCK_NUMBER_LANES)
}

/// Read `count` values back out of compacted words, as the verifier does.
pub fn unpack(words: &[U256], layout: &LaneLayout, count: usize) -> Result<Vec<U256>> {
    let needed = layout.words_for(count);
    if words.len() < needed {
        return Err(OracleError::LengthMismatch {
            field: layout.field,
            expected: needed,
            actual: words.len(),
        });
    }

    let lanes = layout.lanes_per_word();
    Ok((0..count)
        .map(|k| {
            let shift = (k % lanes) * layout.bit_width;
            (words[k / lanes] >> shift) & layout.max_value
        })
        .collect())
}

/// Pack signer indexes: low 16 bits hold the count, lane `k + 1` holds index `k`.
pub fn pack_signer_info(indexes: &[u64]) -> Result<U256> {
    if indexes.len() > MAX_SIGNERS {
        return Err(OracleError::overflow(
            "signer count",
            U256::from(indexes.len()),
            U256::from(MAX_SIGNERS),
        ));
    }

    let mut info = U256::from(indexes.len());
    for (k, index) in indexes.iter().enumerate() {
        if *index > MAX_SIGNER_INDEX {
            return Err(OracleError::overflow(
                "signer index",
                U256::from(*index),
                U256::from(MAX_SIGNER_INDEX),
            ));
        }
        info |= U256::from(*index) << ((k + 1) * SIGNER_INDEX_BITS);
    }

    Ok(info)
}

/// Decode signer info into its index list.
pub fn unpack_signer_info(info: U256) -> Vec<u64> {
    let mask = U256::from(u16::MAX);
    let count = (info & mask).low_u64() as usize;

    (0..count.min(MAX_SIGNERS))
        .map(|k| ((info >> ((k + 1) * SIGNER_INDEX_BITS)) & mask).low_u64())
        .collect()
}
