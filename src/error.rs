//! Error taxonomy for oracle tooling
//!
//! Every variant is fatal for the batch that raised it. Nothing here is
//! retried internally.

use ethers::types::{H256, U256};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OracleError>;

#[derive(Debug, Error)]
pub enum OracleError {
    /// A value does not fit the lane it is about to be packed into.
    #[error("{field} exceeds max value: {value} > {max}")]
    FieldOverflow {
        field: &'static str,
        value: U256,
        max: U256,
    },

    #[error("config mismatch: {0}")]
    ConfigMismatch(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("{symbol}: {check} spread {spread_bps} bps exceeds {max_bps} bps")]
    SpreadTolerance {
        symbol: String,
        check: &'static str,
        spread_bps: U256,
        max_bps: u64,
    },

    #[error("{field} length {actual} does not match expected length {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{symbol}: token decimals {token_decimals} + feed decimals {feed_decimals} exceed 60")]
    DecimalsOutOfRange {
        symbol: String,
        token_decimals: u8,
        feed_decimals: u8,
    },

    #[error("invalid report for feed {feed_id:?}: {reason}")]
    InvalidReport { feed_id: H256, reason: String },

    #[error("arithmetic overflow while {0}")]
    Arithmetic(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("abi decode failed: {0}")]
    Abi(#[from] ethers::abi::Error),

    #[error("hex decode failed: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("malformed report: {0}")]
    Decode(String),

    #[error("provider returned no reports for feed {0:?}")]
    EmptyReportSet(H256),
}

impl OracleError {
    pub fn overflow(field: &'static str, value: U256, max: U256) -> Self {
        OracleError::FieldOverflow { field, value, max }
    }

    /// Network and decode failures, as opposed to validation rejections.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            OracleError::Http(_)
                | OracleError::Rpc(_)
                | OracleError::Abi(_)
                | OracleError::Hex(_)
                | OracleError::Decode(_)
                | OracleError::EmptyReportSet(_)
        )
    }
}
