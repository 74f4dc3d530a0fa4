//! Persistence layer
//!
//! Append-only token history plus the persisted blacklist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::blacklist::BlacklistEntry;
use crate::filter::types::ScreenedToken;

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Durable row written once per surviving candidate per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Row id assigned by the store (None before insertion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub developer: String,
    pub price: f64,
    pub market_cap: f64,
    pub liquidity: f64,
    pub volume: f64,
    pub price_change_24h: f64,
    pub is_rugged: bool,
    pub has_fake_volume: bool,
    pub rugcheck_status: String,
    pub is_bundled_supply: bool,
    pub recorded_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Row for a token that passed every gate
    pub fn from_screened(token: &ScreenedToken, recorded_at: DateTime<Utc>) -> Self {
        let c = &token.candidate;
        Self {
            id: None,
            address: c.address.clone(),
            name: c.name.clone(),
            symbol: c.symbol.clone(),
            developer: c.developer.clone(),
            price: c.price_usd,
            market_cap: c.market_cap_usd,
            liquidity: c.liquidity_usd,
            volume: c.volume_24h_usd,
            price_change_24h: c.price_change_24h_pct,
            is_rugged: false,
            has_fake_volume: false,
            rugcheck_status: token.reputation.as_str().to_string(),
            is_bundled_supply: false,
            recorded_at,
        }
    }

    /// Feature vector used by the outlier model
    pub fn features(&self) -> [f64; 3] {
        [self.price, self.market_cap, self.liquidity]
    }
}

/// Durable record store
pub trait TokenStore: Send + Sync {
    /// Append rows; returns the number written
    fn append(&self, records: &[TokenRecord]) -> Result<usize>;

    /// Full history in insertion order
    fn history(&self) -> Result<Vec<TokenRecord>>;

    /// Persist blacklist entries (existing entries are kept)
    fn save_blacklist(&self, entries: &[BlacklistEntry]) -> Result<()>;

    fn load_blacklist(&self) -> Result<Vec<BlacklistEntry>>;
}
