//! Cycle orchestrator
//!
//! One cycle is `FETCH -> FILTER -> PERSIST -> DETECT -> EXPORT -> NOTIFY`.
//! A failing stage aborts the rest of the cycle; earlier stages are not
//! rolled back. The blacklist is the only in-memory state carried between
//! cycles and lives behind the run lock, so at most one cycle touches it
//! at a time.

use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::anomaly::{AnomalyDetector, OutlierExporter};
use crate::config::{Config, ScheduleConfig};
use crate::dexscreener::MarketDataSource;
use crate::error::Error;
use crate::filter::{Blacklist, FilterPipeline};
use crate::notify::{trade_intent_message, Notifier, CYCLE_COMPLETED_MESSAGE};
use crate::store::{TokenRecord, TokenStore};

/// Pipeline stage, used to attribute cycle failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Filter,
    Persist,
    Detect,
    Export,
    Notify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Filter => "filter",
            Stage::Persist => "persist",
            Stage::Detect => "detect",
            Stage::Export => "export",
            Stage::Notify => "notify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for a completed cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub fetched: usize,
    pub malformed: usize,
    pub passed: usize,
    pub newly_blacklisted: usize,
    pub persisted: usize,
    pub history_rows: usize,
    pub outliers: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Failed { cycle: u64, stage: Stage, error: Error },
    /// Another cycle held the run lock
    Skipped,
}

impl CycleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }
}

struct CycleState {
    blacklist: Blacklist,
}

type StageResult<T> = std::result::Result<T, (Stage, Error)>;

trait AtStage<T> {
    fn at(self, stage: Stage) -> StageResult<T>;
}

impl<T> AtStage<T> for crate::error::Result<T> {
    fn at(self, stage: Stage) -> StageResult<T> {
        self.map_err(|e| (stage, e))
    }
}

pub struct CycleRunner {
    market: Arc<dyn MarketDataSource>,
    pipeline: FilterPipeline,
    store: Arc<dyn TokenStore>,
    detector: AnomalyDetector,
    exporter: OutlierExporter,
    notifier: Arc<dyn Notifier>,
    persist_blacklist: bool,
    state: Mutex<CycleState>,
    cycles: AtomicU64,
}

impl CycleRunner {
    /// Wire the collaborators together; reloads the persisted blacklist when enabled
    pub fn new(
        config: &Config,
        market: Arc<dyn MarketDataSource>,
        pipeline: FilterPipeline,
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> crate::error::Result<Self> {
        let mut blacklist = Blacklist::new(config.blacklist.include_unknown_developer);
        if config.blacklist.persist {
            blacklist.load(store.load_blacklist()?);
            info!(
                tokens = blacklist.token_count(),
                developers = blacklist.developer_count(),
                "Loaded persisted blacklist"
            );
        }

        Ok(Self {
            market,
            pipeline,
            store,
            detector: AnomalyDetector::new(&config.anomaly),
            exporter: OutlierExporter::new(&config.anomaly.export_path),
            notifier,
            persist_blacklist: config.blacklist.persist,
            state: Mutex::new(CycleState { blacklist }),
            cycles: AtomicU64::new(0),
        })
    }

    /// Number of cycles started so far
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Run one cycle unless another is still in flight
    pub async fn try_run(&self) -> CycleOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            warn!(outcome = "skipped", "Previous cycle still running, skipping");
            return CycleOutcome::Skipped;
        };

        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        info!(cycle, "Starting cycle");

        match self.run_stages(&mut state, cycle, started).await {
            Ok(report) => {
                info!(
                    cycle,
                    fetched = report.fetched,
                    malformed = report.malformed,
                    passed = report.passed,
                    blacklisted = report.newly_blacklisted,
                    persisted = report.persisted,
                    history = report.history_rows,
                    outliers = report.outliers,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    outcome = "completed",
                    "Cycle finished"
                );
                CycleOutcome::Completed(report)
            }
            Err((stage, e)) => {
                error!(
                    cycle,
                    stage = %stage,
                    error = %e,
                    retryable = e.is_retryable(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    outcome = "failed",
                    "Cycle aborted"
                );
                CycleOutcome::Failed {
                    cycle,
                    stage,
                    error: e,
                }
            }
        }
    }

    async fn run_stages(
        &self,
        state: &mut CycleState,
        cycle: u64,
        started: Instant,
    ) -> StageResult<CycleReport> {
        let mut report = CycleReport {
            cycle,
            ..Default::default()
        };

        // FETCH
        let batch = self.market.fetch_candidates().await.at(Stage::Fetch)?;
        report.fetched = batch.candidates.len();
        report.malformed = batch.malformed;
        debug!(cycle, fetched = report.fetched, "Fetched candidates");

        // FILTER
        let filtered = self.pipeline.run(batch.candidates, &mut state.blacklist).await;
        report.passed = filtered.passed.len();
        report.newly_blacklisted = filtered.stats.newly_blacklisted;

        // PERSIST
        if self.persist_blacklist {
            self.store
                .save_blacklist(&filtered.new_entries)
                .at(Stage::Persist)?;
        }
        let now = Utc::now();
        let records: Vec<TokenRecord> = filtered
            .passed
            .iter()
            .map(|token| TokenRecord::from_screened(token, now))
            .collect();
        report.persisted = self.store.append(&records).at(Stage::Persist)?;

        // DETECT
        let history = self.store.history().at(Stage::Detect)?;
        report.history_rows = history.len();
        let detection = self.detector.detect(history, &state.blacklist);
        report.outliers = detection.outliers.len();

        // EXPORT
        self.exporter
            .write(&detection.outliers)
            .at(Stage::Export)?;

        // NOTIFY
        for outlier in &detection.outliers {
            self.notifier
                .send(&trade_intent_message(&outlier.record))
                .await
                .at(Stage::Notify)?;
        }
        self.notifier
            .send(CYCLE_COMPLETED_MESSAGE)
            .await
            .at(Stage::Notify)?;

        report.elapsed = started.elapsed();
        Ok(report)
    }
}

/// Run cycles on a fixed interval until `shutdown` resolves.
///
/// Ticks missed while a cycle overruns are dropped, not queued. A shutdown
/// that arrives mid-cycle abandons that cycle at its next await point; rows
/// already persisted stay.
pub async fn run_scheduled<F>(runner: Arc<CycleRunner>, schedule: &ScheduleConfig, shutdown: F)
where
    F: Future<Output = ()>,
{
    let period = Duration::from_secs(schedule.interval_secs);
    let start = if schedule.run_on_start {
        tokio::time::Instant::now()
    } else {
        tokio::time::Instant::now() + period
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Scheduler started (interval: {}s, run on start: {})",
        schedule.interval_secs, schedule.run_on_start
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tokio::select! {
                    _ = runner.try_run() => {}
                    _ = &mut shutdown => {
                        info!("Received shutdown signal, abandoning in-flight cycle");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
        }
    }
}
