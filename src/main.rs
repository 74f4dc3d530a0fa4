//! DexScreener Sentinel - periodic token screener
//!
//! Pulls pairs from DexScreener, drops tokens that fail liquidity, reputation,
//! supply and wash-trading checks, stores the survivors, and announces the
//! statistical outliers of the stored history.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

use dex_sentinel::cli::commands;
use dex_sentinel::config::Config;

/// DexScreener Sentinel - token screener and outlier alerts
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "sentinel.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a cycle on every schedule tick until Ctrl-C
    Run {
        /// Log notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single cycle and print its report
    Once {
        /// Log notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run outlier detection over the stored history
    Analyze,

    /// List persisted blacklist entries
    Blacklist,

    /// Show current configuration (secrets masked)
    Config,
}

impl Commands {
    fn sends_notifications(&self) -> bool {
        matches!(
            self,
            Commands::Run { dry_run: false } | Commands::Once { dry_run: false }
        )
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "dex_sentinel=info"
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    // The config command prints whatever was loaded, valid or not
    if let Commands::Config = cli.command {
        let config = Config::from_sources(&cli.config)?;
        return commands::show_config(&config);
    }

    let mut config = match Config::from_sources(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if !cli.command.sends_notifications() {
        config.telegram.enabled = false;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {:#}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Run { dry_run } => commands::run(&config, dry_run).await,
        Commands::Once { dry_run } => commands::once(&config, dry_run).await,
        Commands::Analyze => commands::analyze(&config),
        Commands::Blacklist => commands::blacklist(&config),
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
