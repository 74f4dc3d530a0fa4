//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub fake_volume: FakeVolumeConfig,
    #[serde(default)]
    pub oracles: OracleConfig,
    #[serde(default)]
    pub blacklist: BlacklistConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_dexscreener_url")]
    pub base_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_dexscreener_url(),
            chain_id: default_chain_id(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Static threshold gate
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum pool liquidity in USD
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity_usd: f64,
    /// Maximum absolute 24h price change in percent
    #[serde(default = "default_max_price_change")]
    pub max_price_change_24h_pct: f64,
    /// Minimum fully-diluted valuation in USD
    #[serde(default = "default_min_market_cap")]
    pub min_market_cap_usd: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usd: default_min_liquidity(),
            max_price_change_24h_pct: default_max_price_change(),
            min_market_cap_usd: default_min_market_cap(),
        }
    }
}

/// Local wash-trading heuristic: high volume with a flat price
#[derive(Debug, Clone, Deserialize)]
pub struct FakeVolumeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fake_volume_threshold")]
    pub volume_threshold_usd: f64,
    #[serde(default = "default_fake_volume_price_change")]
    pub max_price_change_pct: f64,
}

impl Default for FakeVolumeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume_threshold_usd: default_fake_volume_threshold(),
            max_price_change_pct: default_fake_volume_price_change(),
        }
    }
}

/// What a gate does when its oracle cannot be reached
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutagePolicy {
    /// Treat the outage as a pass for this gate
    FailOpen,
    /// Reject the token for this cycle (not blacklisted)
    FailClosed,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OracleConfig {
    #[serde(default)]
    pub rugcheck: RugCheckConfig,
    #[serde(default)]
    pub wash_trading: WashTradingConfig,
    #[serde(default)]
    pub authority: AuthorityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RugCheckConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rugcheck_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    /// Scores strictly below this are "good"
    #[serde(default = "default_risk_score_cutoff")]
    pub risk_score_cutoff: f64,
    #[serde(default = "default_fail_closed")]
    pub on_outage: OutagePolicy,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RugCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_rugcheck_url(),
            api_key: String::new(),
            risk_score_cutoff: default_risk_score_cutoff(),
            on_outage: default_fail_closed(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WashTradingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_pocket_universe_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_fail_open")]
    pub on_outage: OutagePolicy,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for WashTradingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_pocket_universe_url(),
            api_key: String::new(),
            on_outage: default_fail_open(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_solscan_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_fail_open")]
    pub on_outage: OutagePolicy,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_solscan_url(),
            api_key: String::new(),
            on_outage: default_fail_open(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistConfig {
    /// Write blacklist entries to the database and reload them at startup
    #[serde(default = "default_true")]
    pub persist: bool,
    /// Also blacklist the "unknown" developer placeholder
    #[serde(default)]
    pub include_unknown_developer: bool,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            persist: true,
            include_unknown_developer: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyConfig {
    /// Expected fraction of outliers
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    /// Below this many eligible rows detection is skipped
    #[serde(default = "default_min_history_rows")]
    pub min_history_rows: usize,
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Fixed RNG seed for reproducible fits
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_export_path")]
    pub export_path: String,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: default_contamination(),
            min_history_rows: default_min_history_rows(),
            n_trees: default_n_trees(),
            sample_size: default_sample_size(),
            seed: None,
            export_path: default_export_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: default_telegram_api(),
            bot_token: String::new(),
            chat_id: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Run a cycle immediately on start instead of waiting one interval
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_on_start: true,
        }
    }
}

// Default value functions
fn default_dexscreener_url() -> String {
    "https://api.dexscreener.com/latest/dex".into()
}

fn default_chain_id() -> String {
    "solana".into()
}

fn default_timeout_ms() -> u64 {
    10000
}

fn default_min_liquidity() -> f64 {
    10_000.0
}

fn default_max_price_change() -> f64 {
    1_000.0
}

fn default_min_market_cap() -> f64 {
    100_000.0
}

fn default_fake_volume_threshold() -> f64 {
    1_000_000.0
}

fn default_fake_volume_price_change() -> f64 {
    5.0
}

fn default_rugcheck_url() -> String {
    "https://api.rugcheck.xyz/v1/token_analysis".into()
}

fn default_pocket_universe_url() -> String {
    "https://api.pocketuniverse.ai/v1/check_wash_trading".into()
}

fn default_solscan_url() -> String {
    "https://public-api.solscan.io".into()
}

fn default_risk_score_cutoff() -> f64 {
    50.0
}

fn default_fail_open() -> OutagePolicy {
    OutagePolicy::FailOpen
}

fn default_fail_closed() -> OutagePolicy {
    OutagePolicy::FailClosed
}

fn default_contamination() -> f64 {
    0.01
}

fn default_min_history_rows() -> usize {
    8
}

fn default_n_trees() -> usize {
    100
}

fn default_sample_size() -> usize {
    256
}

fn default_export_path() -> String {
    "rugged_coins.csv".into()
}

fn default_database_path() -> String {
    "dex_data.db".into()
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".into()
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables, then validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::from_sources(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge defaults, the optional TOML file and `SENTINEL__*` environment overrides
    pub fn from_sources<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("market_data.base_url", default_dexscreener_url())?
            .set_default("market_data.chain_id", default_chain_id())?
            .set_default("schedule.interval_secs", default_interval_secs() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix SENTINEL_)
            .add_source(
                config::Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_secs == 0 {
            anyhow::bail!("schedule.interval_secs must be positive");
        }

        let t = &self.thresholds;
        if t.min_liquidity_usd < 0.0 || t.min_market_cap_usd < 0.0 || t.max_price_change_24h_pct < 0.0 {
            anyhow::bail!("thresholds must not be negative");
        }

        if self.fake_volume.volume_threshold_usd < 0.0 || self.fake_volume.max_price_change_pct < 0.0 {
            anyhow::bail!("fake_volume thresholds must not be negative");
        }

        if !(self.anomaly.contamination > 0.0 && self.anomaly.contamination <= 0.5) {
            anyhow::bail!(
                "anomaly.contamination must be in (0, 0.5], got {}",
                self.anomaly.contamination
            );
        }

        if self.anomaly.n_trees == 0 || self.anomaly.sample_size < 2 {
            anyhow::bail!("anomaly.n_trees must be positive and anomaly.sample_size at least 2");
        }

        if self.anomaly.min_history_rows < 2 {
            anyhow::bail!("anomaly.min_history_rows must be at least 2");
        }

        if self.telegram.enabled
            && (self.telegram.bot_token.is_empty() || self.telegram.chat_id.is_empty())
        {
            anyhow::bail!(
                "telegram is enabled but bot_token/chat_id are missing \
                 (set SENTINEL__TELEGRAM__BOT_TOKEN and SENTINEL__TELEGRAM__CHAT_ID, or disable telegram)"
            );
        }

        for warning in self.warnings() {
            tracing::warn!("{}", warning);
        }

        Ok(())
    }

    /// Settings that are valid but weaken the screening
    pub fn warnings(&self) -> Vec<&'static str> {
        let rugcheck = &self.oracles.rugcheck;
        let mut warnings = Vec::new();

        if !rugcheck.enabled {
            warnings.push(
                "RugCheck disabled - survivors are stored as unverified and never reach outlier detection",
            );
        } else {
            if rugcheck.api_key.is_empty() {
                warnings.push("RugCheck API key not set - requests will be sent unauthenticated");
            }
            if rugcheck.on_outage == OutagePolicy::FailOpen {
                warnings.push("RugCheck outages will let tokens through the reputation gate");
            }
        }

        warnings
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Market data:
    base_url: {}
    chain: {}
    timeout: {}ms
  Thresholds:
    min_liquidity: ${}
    max_price_change_24h: {}%
    min_market_cap: ${}
  Fake volume:
    enabled: {}
    volume_threshold: ${}
    max_price_change: {}%
  RugCheck:
    enabled: {}
    url: {}
    api_key: {}
    risk_score_cutoff: {}
    on_outage: {:?}
  Wash trading:
    enabled: {}
    url: {}
    api_key: {}
    on_outage: {:?}
  Authority:
    enabled: {}
    base_url: {}
    api_key: {}
    on_outage: {:?}
  Blacklist:
    persist: {}
    include_unknown_developer: {}
  Anomaly:
    contamination: {}
    min_history_rows: {}
    trees: {} (sample {})
    export: {}
  Storage:
    database: {}
  Telegram:
    enabled: {}
    bot_token: {}
    chat_id: {}
  Schedule:
    interval: {}s
"#,
            mask_url(&self.market_data.base_url),
            self.market_data.chain_id,
            self.market_data.timeout_ms,
            self.thresholds.min_liquidity_usd,
            self.thresholds.max_price_change_24h_pct,
            self.thresholds.min_market_cap_usd,
            self.fake_volume.enabled,
            self.fake_volume.volume_threshold_usd,
            self.fake_volume.max_price_change_pct,
            self.oracles.rugcheck.enabled,
            mask_url(&self.oracles.rugcheck.url),
            mask_secret(&self.oracles.rugcheck.api_key),
            self.oracles.rugcheck.risk_score_cutoff,
            self.oracles.rugcheck.on_outage,
            self.oracles.wash_trading.enabled,
            mask_url(&self.oracles.wash_trading.url),
            mask_secret(&self.oracles.wash_trading.api_key),
            self.oracles.wash_trading.on_outage,
            self.oracles.authority.enabled,
            mask_url(&self.oracles.authority.base_url),
            mask_secret(&self.oracles.authority.api_key),
            self.oracles.authority.on_outage,
            self.blacklist.persist,
            self.blacklist.include_unknown_developer,
            self.anomaly.contamination,
            self.anomaly.min_history_rows,
            self.anomaly.n_trees,
            self.anomaly.sample_size,
            self.anomaly.export_path,
            self.storage.database_path,
            self.telegram.enabled,
            mask_secret(&self.telegram.bot_token),
            mask_secret(&self.telegram.chat_id),
            self.schedule.interval_secs,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

fn mask_secret(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "***"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            market_data: MarketDataConfig::default(),
            thresholds: ThresholdConfig::default(),
            fake_volume: FakeVolumeConfig::default(),
            oracles: OracleConfig::default(),
            blacklist: BlacklistConfig::default(),
            anomaly: AnomalyConfig::default(),
            storage: StorageConfig::default(),
            telegram: TelegramConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}
