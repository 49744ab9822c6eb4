//! Oracle Tools Library
//!
//! Price attestation signing, parameter compaction and realtime feed
//! validation for perpetual exchange oracle deployments

pub mod compaction;
pub mod config;
pub mod error;
pub mod oracle;
pub mod persistence;
pub mod realtime_feed;
pub mod signing;
pub mod types;

pub use error::{OracleError, Result};

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` sets the filter (default
/// `info`); `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
