//! Reputation oracles
//!
//! Each oracle answers one safety question about a token address. The
//! pipeline owns the decision of what an unreachable oracle means (see
//! [`OutagePolicy`](crate::config::OutagePolicy)); clients here just
//! return `Err` on transport failures and non-success statuses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod pocket_universe;
pub mod rugcheck;
pub mod solscan;

pub use pocket_universe::PocketUniverseClient;
pub use rugcheck::RugCheckClient;
pub use solscan::SolscanClient;

/// Mint and freeze authority of a token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAuthorities {
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
}

impl TokenAuthorities {
    /// Both authorities resolve to the same identity (both unset counts as equal)
    pub fn authorities_match(&self) -> bool {
        self.mint_authority == self.freeze_authority
    }
}

/// Rug-risk scoring service
#[async_trait]
pub trait ReputationOracle: Send + Sync {
    /// Risk score for the token, `None` if the service reported none
    async fn risk_score(&self, token_address: &str) -> Result<Option<f64>>;
}

/// Wash-trading detection service
#[async_trait]
pub trait WashTradingOracle: Send + Sync {
    async fn is_wash_trading(&self, token_address: &str) -> Result<bool>;
}

/// Token authority lookup (supply-bundling signal)
#[async_trait]
pub trait AuthorityOracle: Send + Sync {
    async fn authorities(&self, token_address: &str) -> Result<TokenAuthorities>;
}
