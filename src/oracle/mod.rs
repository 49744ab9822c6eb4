//! Oracle module - self-operated signer quorum
//!
//! Builds the signed, compacted price bundle submitted to the oracle verifier.

mod params;

pub use params::{OracleParams, OracleParamsBuilder};
