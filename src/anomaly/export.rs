//! CSV export of flagged tokens
//!
//! The file is rewritten every cycle; an empty detection still leaves a
//! header-only file so downstream readers never see stale rows.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

use super::Outlier;

const HEADER: [&str; 16] = [
    "id",
    "address",
    "name",
    "symbol",
    "developer",
    "price",
    "market_cap",
    "liquidity",
    "volume",
    "price_change_24h",
    "is_rugged",
    "has_fake_volume",
    "rugcheck_status",
    "is_bundled_supply",
    "recorded_at",
    "anomaly_score",
];

#[derive(Serialize)]
struct OutlierRow<'a> {
    id: Option<i64>,
    address: &'a str,
    name: &'a str,
    symbol: &'a str,
    developer: &'a str,
    price: f64,
    market_cap: f64,
    liquidity: f64,
    volume: f64,
    price_change_24h: f64,
    is_rugged: bool,
    has_fake_volume: bool,
    rugcheck_status: &'a str,
    is_bundled_supply: bool,
    recorded_at: String,
    anomaly_score: f64,
}

impl<'a> From<&'a Outlier> for OutlierRow<'a> {
    fn from(o: &'a Outlier) -> Self {
        let r = &o.record;
        Self {
            id: r.id,
            address: &r.address,
            name: &r.name,
            symbol: &r.symbol,
            developer: &r.developer,
            price: r.price,
            market_cap: r.market_cap,
            liquidity: r.liquidity,
            volume: r.volume,
            price_change_24h: r.price_change_24h,
            is_rugged: r.is_rugged,
            has_fake_volume: r.has_fake_volume,
            rugcheck_status: &r.rugcheck_status,
            is_bundled_supply: r.is_bundled_supply,
            recorded_at: r.recorded_at.to_rfc3339(),
            anomaly_score: o.score,
        }
    }
}

pub struct OutlierExporter {
    path: PathBuf,
}

impl OutlierExporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the export file with `outliers`
    pub fn write(&self, outliers: &[Outlier]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;

        writer.write_record(HEADER)?;
        for outlier in outliers {
            writer.serialize(OutlierRow::from(outlier))?;
        }
        writer.flush()?;

        info!("Exported {} outliers to {}", outliers.len(), self.path.display());
        Ok(())
    }
}
