//! Filter pipeline
//!
//! Gates run in a fixed order and stop at the first failure:
//!
//! 1. membership (token / developer blacklist)
//! 2. thresholds (liquidity, |24h change|, market cap)
//! 3. reputation oracle (risk score below cutoff)
//! 4. supply integrity oracle (mint authority != freeze authority)
//! 5. fake-volume heuristic (local)
//! 6. fake-volume oracle
//!
//! A failure at gates 3-6 blacklists the token address and its developer.
//! Gates 1-2 never call an oracle.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, OutagePolicy, ThresholdConfig};
use crate::error::Result;
use crate::filter::blacklist::{Blacklist, BlacklistEntry};
use crate::filter::heuristics::FakeVolumeHeuristic;
use crate::filter::oracles::{
    AuthorityOracle, PocketUniverseClient, ReputationOracle, RugCheckClient, SolscanClient,
    WashTradingOracle,
};
use crate::filter::types::{
    FilterStats, Gate, GateOutcome, RejectReason, ReputationStatus, ScreenedToken, TokenCandidate,
};

/// Outcome of running one candidate through every gate
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Passed(ScreenedToken),
    Rejected {
        gate: Gate,
        reason: RejectReason,
        /// Whether the rejection is evidence against the token
        blacklist: bool,
    },
}

/// Result of filtering one cycle's candidates
#[derive(Debug, Default)]
pub struct FilterReport {
    /// Survivors in source order
    pub passed: Vec<ScreenedToken>,
    /// Entries added to the blacklist during this pass
    pub new_entries: Vec<BlacklistEntry>,
    pub stats: FilterStats,
}

struct ReputationGate {
    oracle: Arc<dyn ReputationOracle>,
    cutoff: f64,
    on_outage: OutagePolicy,
}

struct AuthorityGate {
    oracle: Arc<dyn AuthorityOracle>,
    on_outage: OutagePolicy,
}

struct WashTradingGate {
    oracle: Arc<dyn WashTradingOracle>,
    on_outage: OutagePolicy,
}

/// Combines thresholds, oracles and the local heuristic into one decision
pub struct FilterPipeline {
    thresholds: ThresholdConfig,
    fake_volume: FakeVolumeHeuristic,
    reputation: Option<ReputationGate>,
    authority: Option<AuthorityGate>,
    wash_trading: Option<WashTradingGate>,
}

impl FilterPipeline {
    /// Pipeline with only the local gates; attach oracles with the `with_*` builders
    pub fn new(thresholds: ThresholdConfig, fake_volume: FakeVolumeHeuristic) -> Self {
        Self {
            thresholds,
            fake_volume,
            reputation: None,
            authority: None,
            wash_trading: None,
        }
    }

    /// Build the pipeline with HTTP oracle clients for every enabled oracle
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut pipeline = Self::new(
            config.thresholds.clone(),
            FakeVolumeHeuristic::new(config.fake_volume.clone()),
        );

        let oracles = &config.oracles;
        if oracles.rugcheck.enabled {
            pipeline = pipeline.with_reputation(
                Arc::new(RugCheckClient::new(&oracles.rugcheck)?),
                oracles.rugcheck.risk_score_cutoff,
                oracles.rugcheck.on_outage,
            );
        }
        if oracles.authority.enabled {
            pipeline = pipeline.with_authority(
                Arc::new(SolscanClient::new(&oracles.authority)?),
                oracles.authority.on_outage,
            );
        }
        if oracles.wash_trading.enabled {
            pipeline = pipeline.with_wash_trading(
                Arc::new(PocketUniverseClient::new(&oracles.wash_trading)?),
                oracles.wash_trading.on_outage,
            );
        }

        Ok(pipeline)
    }

    pub fn with_reputation(
        mut self,
        oracle: Arc<dyn ReputationOracle>,
        cutoff: f64,
        on_outage: OutagePolicy,
    ) -> Self {
        self.reputation = Some(ReputationGate {
            oracle,
            cutoff,
            on_outage,
        });
        self
    }

    pub fn with_authority(mut self, oracle: Arc<dyn AuthorityOracle>, on_outage: OutagePolicy) -> Self {
        self.authority = Some(AuthorityGate { oracle, on_outage });
        self
    }

    pub fn with_wash_trading(
        mut self,
        oracle: Arc<dyn WashTradingOracle>,
        on_outage: OutagePolicy,
    ) -> Self {
        self.wash_trading = Some(WashTradingGate { oracle, on_outage });
        self
    }

    /// Filter one cycle's candidates, updating the blacklist in place
    pub async fn run(&self, candidates: Vec<TokenCandidate>, blacklist: &mut Blacklist) -> FilterReport {
        let mut report = FilterReport::default();

        for candidate in candidates {
            report.stats.evaluated += 1;

            match self.evaluate(&candidate, blacklist).await {
                Evaluation::Passed(token) => {
                    debug!("Token {} ({}) passed all gates", candidate.symbol, candidate.address);
                    report.stats.passed += 1;
                    report.passed.push(token);
                }
                Evaluation::Rejected {
                    gate,
                    reason,
                    blacklist: true,
                } => {
                    let added = blacklist.blacklist(&candidate, gate, &reason.to_string());
                    warn!(
                        gate = %gate,
                        "Blacklisted token: {} ({}) - {}",
                        candidate.name, candidate.address, reason
                    );
                    report.stats.newly_blacklisted += 1;
                    report.new_entries.extend(added);
                }
                Evaluation::Rejected { gate, reason, .. } => {
                    match gate {
                        Gate::Membership => report.stats.rejected_membership += 1,
                        Gate::Threshold => report.stats.rejected_threshold += 1,
                        _ => report.stats.rejected_outage += 1,
                    }
                    debug!(
                        gate = %gate,
                        "Token {} ({}) filtered out: {}",
                        candidate.symbol, candidate.address, reason
                    );
                }
            }
        }

        info!(
            evaluated = report.stats.evaluated,
            passed = report.stats.passed,
            blacklisted = report.stats.newly_blacklisted,
            "Filter pass complete"
        );

        report
    }

    /// Run every gate for a single candidate, stopping at the first failure
    pub async fn evaluate(&self, candidate: &TokenCandidate, blacklist: &Blacklist) -> Evaluation {
        if let GateOutcome::Reject(reason) = self.check_membership(candidate, blacklist) {
            return rejected(Gate::Membership, reason);
        }

        if let GateOutcome::Reject(reason) = self.check_thresholds(candidate) {
            return rejected(Gate::Threshold, reason);
        }

        let (reputation, risk_score) = match self.check_reputation(candidate).await {
            Ok(status) => status,
            Err(evaluation) => return evaluation,
        };

        if let Err(evaluation) = self.check_supply_integrity(candidate).await {
            return evaluation;
        }

        if let GateOutcome::Reject(reason) = self.fake_volume.check(candidate) {
            return rejected(Gate::FakeVolumeHeuristic, reason);
        }

        if let Err(evaluation) = self.check_wash_trading(candidate).await {
            return evaluation;
        }

        Evaluation::Passed(ScreenedToken {
            candidate: candidate.clone(),
            reputation,
            risk_score,
        })
    }

    fn check_membership(&self, candidate: &TokenCandidate, blacklist: &Blacklist) -> GateOutcome {
        if blacklist.contains_token(&candidate.address) {
            return GateOutcome::Reject(RejectReason::BlacklistedToken);
        }
        if blacklist.contains_developer(&candidate.developer) {
            return GateOutcome::Reject(RejectReason::BlacklistedDeveloper(candidate.developer.clone()));
        }
        GateOutcome::Pass
    }

    fn check_thresholds(&self, candidate: &TokenCandidate) -> GateOutcome {
        let t = &self.thresholds;
        if candidate.liquidity_usd < t.min_liquidity_usd {
            return GateOutcome::Reject(RejectReason::LiquidityBelowMinimum(candidate.liquidity_usd));
        }
        if candidate.price_change_24h_pct.abs() > t.max_price_change_24h_pct {
            return GateOutcome::Reject(RejectReason::PriceChangeExceeded(candidate.price_change_24h_pct));
        }
        if candidate.market_cap_usd < t.min_market_cap_usd {
            return GateOutcome::Reject(RejectReason::MarketCapBelowMinimum(candidate.market_cap_usd));
        }
        GateOutcome::Pass
    }

    async fn check_reputation(
        &self,
        candidate: &TokenCandidate,
    ) -> std::result::Result<(ReputationStatus, Option<f64>), Evaluation> {
        let Some(gate) = &self.reputation else {
            return Ok((ReputationStatus::Unverified, None));
        };

        match gate.oracle.risk_score(&candidate.address).await {
            Ok(Some(score)) if score < gate.cutoff => Ok((ReputationStatus::Good, Some(score))),
            Ok(score) => Err(rejected(Gate::Reputation, RejectReason::HighRiskScore(score))),
            Err(e) => {
                warn!("Reputation check failed for {}: {}", candidate.address, e);
                match gate.on_outage {
                    OutagePolicy::FailOpen => Ok((ReputationStatus::Unverified, None)),
                    OutagePolicy::FailClosed => Err(outage(Gate::Reputation, e.to_string())),
                }
            }
        }
    }

    async fn check_supply_integrity(&self, candidate: &TokenCandidate) -> std::result::Result<(), Evaluation> {
        let Some(gate) = &self.authority else {
            return Ok(());
        };

        match gate.oracle.authorities(&candidate.address).await {
            Ok(authorities) if authorities.authorities_match() => Err(rejected(
                Gate::SupplyIntegrity,
                RejectReason::AuthoritiesMatch(authorities.mint_authority),
            )),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Authority check failed for {}: {}", candidate.address, e);
                match gate.on_outage {
                    OutagePolicy::FailOpen => Ok(()),
                    OutagePolicy::FailClosed => Err(outage(Gate::SupplyIntegrity, e.to_string())),
                }
            }
        }
    }

    async fn check_wash_trading(&self, candidate: &TokenCandidate) -> std::result::Result<(), Evaluation> {
        let Some(gate) = &self.wash_trading else {
            return Ok(());
        };

        match gate.oracle.is_wash_trading(&candidate.address).await {
            Ok(true) => Err(rejected(Gate::FakeVolumeOracle, RejectReason::WashTrading)),
            Ok(false) => Ok(()),
            Err(e) => {
                warn!("Failed to check fake volume for {}: {}", candidate.address, e);
                match gate.on_outage {
                    OutagePolicy::FailOpen => Ok(()),
                    OutagePolicy::FailClosed => Err(outage(Gate::FakeVolumeOracle, e.to_string())),
                }
            }
        }
    }
}

fn rejected(gate: Gate, reason: RejectReason) -> Evaluation {
    Evaluation::Rejected {
        gate,
        reason,
        blacklist: gate.blacklists_on_failure(),
    }
}

fn outage(gate: Gate, message: String) -> Evaluation {
    Evaluation::Rejected {
        gate,
        reason: RejectReason::OracleUnavailable(message),
        blacklist: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FakeVolumeConfig;
    use crate::filter::oracles::TokenAuthorities;
    use crate::testing::{candidate, FakeAuthority, FakeReputation, FakeWashTrading};

    struct Oracles {
        reputation: Arc<FakeReputation>,
        authority: Arc<FakeAuthority>,
        wash: Arc<FakeWashTrading>,
    }

    impl Oracles {
        fn safe() -> Self {
            Self {
                reputation: Arc::new(FakeReputation::score(10.0)),
                authority: Arc::new(FakeAuthority::distinct()),
                wash: Arc::new(FakeWashTrading::flag(false)),
            }
        }

        fn total_calls(&self) -> usize {
            self.reputation.calls() + self.authority.calls() + self.wash.calls()
        }

        fn pipeline(&self) -> FilterPipeline {
            self.pipeline_with(OutagePolicy::FailClosed, OutagePolicy::FailOpen, OutagePolicy::FailOpen)
        }

        fn pipeline_with(
            &self,
            reputation: OutagePolicy,
            authority: OutagePolicy,
            wash: OutagePolicy,
        ) -> FilterPipeline {
            FilterPipeline::new(
                ThresholdConfig::default(),
                FakeVolumeHeuristic::new(FakeVolumeConfig::default()),
            )
            .with_reputation(self.reputation.clone(), 50.0, reputation)
            .with_authority(self.authority.clone(), authority)
            .with_wash_trading(self.wash.clone(), wash)
        }
    }

    #[tokio::test]
    async fn test_healthy_candidate_passes() {
        let oracles = Oracles::safe();
        let pipeline = oracles.pipeline();
        let mut blacklist = Blacklist::new(false);

        let report = pipeline.run(vec![candidate("Mint1", "Dev1")], &mut blacklist).await;

        assert_eq!(report.passed.len(), 1);
        assert_eq!(report.passed[0].reputation, ReputationStatus::Good);
        assert_eq!(report.passed[0].risk_score, Some(10.0));
        assert!(report.new_entries.is_empty());
        assert_eq!(oracles.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_threshold_failures_skip_oracles() {
        let oracles = Oracles::safe();
        let pipeline = oracles.pipeline();
        let mut blacklist = Blacklist::new(false);

        let mut low_liquidity = candidate("Mint1", "Dev1");
        low_liquidity.liquidity_usd = 9_999.0;
        let mut low_cap = candidate("Mint2", "Dev2");
        low_cap.market_cap_usd = 99_999.0;
        let mut wild_swing = candidate("Mint3", "Dev3");
        wild_swing.price_change_24h_pct = -1_000.5;

        let report = pipeline
            .run(vec![low_liquidity, low_cap, wild_swing], &mut blacklist)
            .await;

        assert!(report.passed.is_empty());
        assert_eq!(report.stats.rejected_threshold, 3);
        assert_eq!(oracles.total_calls(), 0);
        assert_eq!(blacklist.token_count(), 0);
    }

    #[tokio::test]
    async fn test_blacklisted_token_skips_oracles() {
        let oracles = Oracles::safe();
        let pipeline = oracles.pipeline();
        let mut blacklist = Blacklist::new(false);
        blacklist.blacklist(&candidate("Mint1", "DevX"), Gate::Reputation, "seeded");

        let report = pipeline.run(vec![candidate("Mint1", "Dev1")], &mut blacklist).await;
        assert!(report.passed.is_empty());
        assert_eq!(report.stats.rejected_membership, 1);

        // Different token, same blacklisted developer
        let report = pipeline.run(vec![candidate("Mint2", "DevX")], &mut blacklist).await;
        assert!(report.passed.is_empty());
        assert_eq!(report.stats.rejected_membership, 1);

        assert_eq!(oracles.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_fake_volume_heuristic_blacklists() {
        let oracles = Oracles::safe();
        let pipeline = oracles.pipeline();
        let mut blacklist = Blacklist::new(false);

        let mut washed = candidate("Mint1", "Dev1");
        washed.volume_24h_usd = 2_000_000.0;
        washed.price_change_24h_pct = 1.0;

        let report = pipeline.run(vec![washed.clone()], &mut blacklist).await;

        assert!(report.passed.is_empty());
        assert_eq!(report.stats.newly_blacklisted, 1);
        assert_eq!(report.new_entries.len(), 2);
        assert!(blacklist.contains_token("Mint1"));
        assert!(blacklist.contains_developer("Dev1"));
        // Never reaches the wash-trading oracle
        assert_eq!(oracles.wash.calls(), 0);

        // Still excluded next cycle, even with clean metrics
        let clean = candidate("Mint1", "Dev1");
        let report = pipeline.run(vec![clean], &mut blacklist).await;
        assert!(report.passed.is_empty());
        assert_eq!(report.stats.rejected_membership, 1);
    }

    #[tokio::test]
    async fn test_fake_volume_heuristic_ignores_oracles() {
        let oracles = Oracles::safe();
        let pipeline = oracles.pipeline();
        let blacklist = Blacklist::new(false);

        let mut washed = candidate("Mint1", "Dev1");
        washed.volume_24h_usd = 1_500_000.0;
        washed.price_change_24h_pct = -4.0;

        let evaluation = pipeline.evaluate(&washed, &blacklist).await;
        assert!(matches!(
            evaluation,
            Evaluation::Rejected {
                gate: Gate::FakeVolumeHeuristic,
                blacklist: true,
                ..
            }
        ));
        assert_eq!(oracles.reputation.calls(), 1);
        assert_eq!(oracles.wash.calls(), 0);
    }

    #[tokio::test]
    async fn test_each_oracle_gate_blacklists() {
        let mut blacklist = Blacklist::new(false);

        let risky = Oracles {
            reputation: Arc::new(FakeReputation::score(75.0)),
            ..Oracles::safe()
        };
        let report = risky.pipeline().run(vec![candidate("Mint1", "Dev1")], &mut blacklist).await;
        assert!(report.passed.is_empty());
        assert_eq!(risky.authority.calls(), 0);

        let bundled = Oracles {
            authority: Arc::new(FakeAuthority::fixed(TokenAuthorities {
                mint_authority: Some("Same".into()),
                freeze_authority: Some("Same".into()),
            })),
            ..Oracles::safe()
        };
        let report = bundled.pipeline().run(vec![candidate("Mint2", "Dev2")], &mut blacklist).await;
        assert!(report.passed.is_empty());

        let washed = Oracles {
            wash: Arc::new(FakeWashTrading::flag(true)),
            ..Oracles::safe()
        };
        let report = washed.pipeline().run(vec![candidate("Mint3", "Dev3")], &mut blacklist).await;
        assert!(report.passed.is_empty());

        for (mint, dev) in [("Mint1", "Dev1"), ("Mint2", "Dev2"), ("Mint3", "Dev3")] {
            assert!(blacklist.contains_token(mint));
            assert!(blacklist.contains_developer(dev));
        }
    }

    #[tokio::test]
    async fn test_missing_risk_score_is_not_good() {
        let oracles = Oracles {
            reputation: Arc::new(FakeReputation::missing()),
            ..Oracles::safe()
        };
        let mut blacklist = Blacklist::new(false);
        let report = oracles.pipeline().run(vec![candidate("Mint1", "Dev1")], &mut blacklist).await;
        assert!(report.passed.is_empty());
        assert!(blacklist.contains_token("Mint1"));
    }

    #[tokio::test]
    async fn test_fail_open_outages_pass() {
        let oracles = Oracles {
            reputation: Arc::new(FakeReputation::down()),
            authority: Arc::new(FakeAuthority::down()),
            wash: Arc::new(FakeWashTrading::down()),
        };
        let pipeline = oracles.pipeline_with(
            OutagePolicy::FailOpen,
            OutagePolicy::FailOpen,
            OutagePolicy::FailOpen,
        );
        let mut blacklist = Blacklist::new(false);

        let report = pipeline.run(vec![candidate("Mint1", "Dev1")], &mut blacklist).await;

        assert_eq!(report.passed.len(), 1);
        assert_eq!(report.passed[0].reputation, ReputationStatus::Unverified);
        assert_eq!(blacklist.token_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_closed_outage_rejects_without_blacklisting() {
        let oracles = Oracles {
            reputation: Arc::new(FakeReputation::down()),
            ..Oracles::safe()
        };
        let pipeline = oracles.pipeline();
        let mut blacklist = Blacklist::new(false);

        let report = pipeline.run(vec![candidate("Mint1", "Dev1")], &mut blacklist).await;

        assert!(report.passed.is_empty());
        assert_eq!(report.stats.rejected_outage, 1);
        assert_eq!(report.stats.newly_blacklisted, 0);
        assert!(!blacklist.contains_token("Mint1"));
    }

    #[tokio::test]
    async fn test_output_preserves_source_order() {
        let oracles = Oracles::safe();
        let pipeline = oracles.pipeline();
        let mut blacklist = Blacklist::new(false);

        let mut rejected = candidate("Mint2", "Dev2");
        rejected.liquidity_usd = 1.0;
        let report = pipeline
            .run(
                vec![candidate("Mint3", "Dev3"), rejected, candidate("Mint1", "Dev1")],
                &mut blacklist,
            )
            .await;

        let order: Vec<_> = report.passed.iter().map(|t| t.candidate.address.as_str()).collect();
        assert_eq!(order, vec!["Mint3", "Mint1"]);
    }

    #[tokio::test]
    async fn test_local_gates_only() {
        let pipeline = FilterPipeline::new(
            ThresholdConfig::default(),
            FakeVolumeHeuristic::new(FakeVolumeConfig::default()),
        );
        let mut blacklist = Blacklist::new(false);
        let report = pipeline.run(vec![candidate("Mint1", "Dev1")], &mut blacklist).await;
        assert_eq!(report.passed.len(), 1);
        assert_eq!(report.passed[0].reputation, ReputationStatus::Unverified);
    }
}
