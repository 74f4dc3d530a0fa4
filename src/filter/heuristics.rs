//! Local fake-volume heuristic
//!
//! Wash trading tends to show up as a large 24h volume while the price
//! barely moves: real demand at that size moves the price.

use crate::config::FakeVolumeConfig;
use crate::filter::types::{GateOutcome, RejectReason, TokenCandidate};

pub struct FakeVolumeHeuristic {
    config: FakeVolumeConfig,
}

impl FakeVolumeHeuristic {
    pub fn new(config: FakeVolumeConfig) -> Self {
        Self { config }
    }

    /// Volume above the threshold while |24h change| stays below the flat-price bound
    pub fn is_suspicious(&self, candidate: &TokenCandidate) -> bool {
        self.config.enabled
            && candidate.volume_24h_usd > self.config.volume_threshold_usd
            && candidate.price_change_24h_pct.abs() < self.config.max_price_change_pct
    }

    pub fn check(&self, candidate: &TokenCandidate) -> GateOutcome {
        if self.is_suspicious(candidate) {
            GateOutcome::Reject(RejectReason::SuspiciousVolume {
                volume: candidate.volume_24h_usd,
                price_change_pct: candidate.price_change_24h_pct,
            })
        } else {
            GateOutcome::Pass
        }
    }
}
