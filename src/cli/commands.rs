//! CLI command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::anomaly::AnomalyDetector;
use crate::config::Config;
use crate::cycle::{run_scheduled, CycleOutcome, CycleRunner};
use crate::dexscreener::DexScreenerClient;
use crate::filter::{Blacklist, FilterPipeline};
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::store::{SqliteStore, TokenStore};

fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.storage.database_path)
        .with_context(|| format!("Failed to open {}", config.storage.database_path))?;
    Ok(Arc::new(store))
}

fn build_runner(config: &Config, dry_run: bool) -> Result<CycleRunner> {
    let notifier: Arc<dyn Notifier> = if dry_run || !config.telegram.enabled {
        info!("Notifications go to the log only");
        Arc::new(LogNotifier)
    } else {
        Arc::new(TelegramNotifier::new(&config.telegram)?)
    };

    let runner = CycleRunner::new(
        config,
        Arc::new(DexScreenerClient::new(&config.market_data)?),
        FilterPipeline::from_config(config)?,
        open_store(config)?,
        notifier,
    )?;
    Ok(runner)
}

/// Run cycles on the configured interval until Ctrl-C
pub async fn run(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("Running in DRY-RUN mode - no Telegram messages will be sent");
    }

    let runner = Arc::new(build_runner(config, dry_run)?);
    run_scheduled(runner, &config.schedule, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    Ok(())
}

/// Run a single cycle
pub async fn once(config: &Config, dry_run: bool) -> Result<()> {
    let runner = build_runner(config, dry_run)?;

    match runner.try_run().await {
        CycleOutcome::Completed(report) => {
            println!("\n=== CYCLE {} ===\n", report.cycle);
            println!("Fetched:           {} ({} malformed)", report.fetched, report.malformed);
            println!("Passed filters:    {}", report.passed);
            println!("Newly blacklisted: {}", report.newly_blacklisted);
            println!("Persisted:         {}", report.persisted);
            println!("History rows:      {}", report.history_rows);
            println!("Outliers:          {}", report.outliers);
            println!("Elapsed:           {}ms", report.elapsed.as_millis());
            Ok(())
        }
        CycleOutcome::Failed { stage, error, .. } => {
            Err(anyhow::anyhow!("cycle failed at {} stage: {}", stage, error))
        }
        CycleOutcome::Skipped => Ok(()),
    }
}

/// Run outlier detection over the stored history without fetching
pub fn analyze(config: &Config) -> Result<()> {
    let store = open_store(config)?;

    let mut blacklist = Blacklist::new(config.blacklist.include_unknown_developer);
    blacklist.load(store.load_blacklist()?);

    let history = store.history()?;
    let report = AnomalyDetector::new(&config.anomaly).detect(history, &blacklist);

    println!("\n=== OUTLIER ANALYSIS ===\n");
    println!("Eligible rows: {} ({} excluded)", report.eligible, report.excluded);

    if report.skipped {
        println!(
            "Not enough history (need {} eligible rows).",
            config.anomaly.min_history_rows
        );
        return Ok(());
    }

    if report.outliers.is_empty() {
        println!("No outliers.");
        return Ok(());
    }

    println!(
        "\n{:<46} {:<10} {:>14} {:>16} {:>14} {:>7}",
        "ADDRESS", "SYMBOL", "PRICE", "MARKET CAP", "LIQUIDITY", "SCORE"
    );
    for o in &report.outliers {
        let r = &o.record;
        println!(
            "{:<46} {:<10} {:>14.8} {:>16.2} {:>14.2} {:>7.3}",
            r.address, r.symbol, r.price, r.market_cap, r.liquidity, o.score
        );
    }

    Ok(())
}

/// List persisted blacklist entries
pub fn blacklist(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let entries = store.load_blacklist()?;

    println!("\n=== BLACKLIST ({} entries) ===\n", entries.len());
    if !config.blacklist.persist {
        println!("Note: blacklist.persist is off; entries below are from earlier runs.\n");
    }

    for e in &entries {
        println!(
            "{:<10} {:<46} {:<22} {}  {}",
            e.kind,
            e.value,
            e.gate,
            e.created_at.format("%Y-%m-%d %H:%M:%S"),
            e.reason
        );
    }

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    if let Err(e) = config.validate() {
        println!("\nValidation: {}", e);
    }
    Ok(())
}
