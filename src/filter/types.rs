//! Core types for the filter pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used when the aggregator does not expose a developer
pub const UNKNOWN_DEVELOPER: &str = "unknown";

/// A token record fetched this cycle, not yet filtered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCandidate {
    /// Base token address (identity)
    pub address: String,
    pub name: String,
    pub symbol: String,
    /// Developer identity, `UNKNOWN_DEVELOPER` when not available
    pub developer: String,
    /// Price in USD
    pub price_usd: f64,
    /// Fully-diluted valuation in USD
    pub market_cap_usd: f64,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    /// 24h price change in percent
    pub price_change_24h_pct: f64,
}

impl TokenCandidate {
    /// Whether the developer identity is the "unknown" placeholder
    pub fn has_unknown_developer(&self) -> bool {
        self.developer.is_empty() || self.developer == UNKNOWN_DEVELOPER
    }
}

/// One pass/fail check in the filter pipeline, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Membership,
    Threshold,
    Reputation,
    SupplyIntegrity,
    FakeVolumeHeuristic,
    FakeVolumeOracle,
}

impl Gate {
    /// Failing this gate blacklists the token and its developer
    pub fn blacklists_on_failure(&self) -> bool {
        !matches!(self, Gate::Membership | Gate::Threshold)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::Membership => "membership",
            Gate::Threshold => "threshold",
            Gate::Reputation => "reputation",
            Gate::SupplyIntegrity => "supply_integrity",
            Gate::FakeVolumeHeuristic => "fake_volume_heuristic",
            Gate::FakeVolumeOracle => "fake_volume_oracle",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason why a token was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Address already blacklisted
    BlacklistedToken,
    /// Developer already blacklisted
    BlacklistedDeveloper(String),
    LiquidityBelowMinimum(f64),
    PriceChangeExceeded(f64),
    MarketCapBelowMinimum(f64),
    /// Risk score at or above the cutoff (None = no score reported)
    HighRiskScore(Option<f64>),
    /// Mint and freeze authority are the same identity
    AuthoritiesMatch(Option<String>),
    /// High volume with a flat price
    SuspiciousVolume { volume: f64, price_change_pct: f64 },
    /// Wash-trading oracle flagged the token
    WashTrading,
    /// Oracle unavailable and the gate fails closed
    OracleUnavailable(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BlacklistedToken => write!(f, "token is blacklisted"),
            RejectReason::BlacklistedDeveloper(dev) => write!(f, "developer {} is blacklisted", dev),
            RejectReason::LiquidityBelowMinimum(usd) => write!(f, "liquidity ${} below minimum", usd),
            RejectReason::PriceChangeExceeded(pct) => write!(f, "24h price change {}% exceeds max", pct),
            RejectReason::MarketCapBelowMinimum(usd) => write!(f, "market cap ${} below minimum", usd),
            RejectReason::HighRiskScore(Some(score)) => write!(f, "risk score {} not below cutoff", score),
            RejectReason::HighRiskScore(None) => write!(f, "no risk score reported"),
            RejectReason::AuthoritiesMatch(Some(auth)) => {
                write!(f, "mint and freeze authority are both {}", auth)
            }
            RejectReason::AuthoritiesMatch(None) => write!(f, "mint and freeze authority are both unset"),
            RejectReason::SuspiciousVolume {
                volume,
                price_change_pct,
            } => write!(f, "volume ${} with only {}% price movement", volume, price_change_pct),
            RejectReason::WashTrading => write!(f, "wash trading reported"),
            RejectReason::OracleUnavailable(msg) => write!(f, "oracle unavailable: {}", msg),
        }
    }
}

/// Result of evaluating one gate
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Pass,
    Reject(RejectReason),
}

impl GateOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateOutcome::Pass)
    }
}

/// Reputation status recorded with a surviving token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationStatus {
    /// Oracle answered with a low risk score
    Good,
    /// Passed only because the oracle was unavailable or disabled
    Unverified,
}

impl ReputationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReputationStatus::Good => "good",
            ReputationStatus::Unverified => "unverified",
        }
    }
}

/// A candidate that passed every gate, with the evidence gathered on the way
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenedToken {
    pub candidate: TokenCandidate,
    pub reputation: ReputationStatus,
    /// Risk score reported by the reputation oracle, if any
    pub risk_score: Option<f64>,
}

/// Per-cycle filter statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterStats {
    pub evaluated: usize,
    pub passed: usize,
    pub rejected_membership: usize,
    pub rejected_threshold: usize,
    pub newly_blacklisted: usize,
    /// Rejected for this cycle only because an oracle was down
    pub rejected_outage: usize,
}
