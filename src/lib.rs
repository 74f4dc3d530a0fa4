//! DexScreener Sentinel Library
//!
//! Periodic token screening: market data, filter gates with a memoizing
//! blacklist, SQLite history, isolation-forest outliers and notifications.

pub mod anomaly;
pub mod cli;
pub mod config;
pub mod cycle;
pub mod dexscreener;
pub mod error;
pub mod filter;
pub mod notify;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use cycle::{CycleOutcome, CycleReport, CycleRunner};
pub use error::{Error, Result};
