//! Outlier detection over the stored token history
//!
//! Rows already known to be bad (blacklisted token or developer, fake volume,
//! unverified reputation, bundled supply) are excluded before fitting so the
//! model learns what a clean token looks like.

use tracing::{debug, info};

use crate::config::AnomalyConfig;
use crate::filter::blacklist::Blacklist;
use crate::filter::types::ReputationStatus;
use crate::store::TokenRecord;

pub mod export;
pub mod isolation_forest;

pub use export::OutlierExporter;
pub use isolation_forest::{IsolationForest, Prediction};

/// A history row the model flagged
#[derive(Debug, Clone, PartialEq)]
pub struct Outlier {
    pub record: TokenRecord,
    pub score: f64,
}

/// Result of one detection pass
#[derive(Debug, Default)]
pub struct DetectionReport {
    /// Rows fed to the model
    pub eligible: usize,
    /// Rows dropped by the exclusion rules
    pub excluded: usize,
    /// True when there were too few eligible rows to fit
    pub skipped: bool,
    pub outliers: Vec<Outlier>,
}

pub struct AnomalyDetector {
    forest: IsolationForest,
    min_history_rows: usize,
}

impl AnomalyDetector {
    pub fn new(config: &AnomalyConfig) -> Self {
        Self {
            forest: IsolationForest {
                n_trees: config.n_trees,
                sample_size: config.sample_size,
                contamination: config.contamination,
                seed: config.seed,
            },
            min_history_rows: config.min_history_rows,
        }
    }

    /// Whether a history row may be used for fitting
    pub fn is_eligible(record: &TokenRecord, blacklist: &Blacklist) -> bool {
        !blacklist.contains_token(&record.address)
            && !blacklist.contains_developer(&record.developer)
            && !record.has_fake_volume
            && !record.is_bundled_supply
            && record.rugcheck_status == ReputationStatus::Good.as_str()
            && record.features().iter().all(|v| v.is_finite())
    }

    /// Fit on the eligible part of `history` and return the rows flagged as outliers
    pub fn detect(&self, history: Vec<TokenRecord>, blacklist: &Blacklist) -> DetectionReport {
        let total = history.len();
        let eligible: Vec<TokenRecord> = history
            .into_iter()
            .filter(|r| Self::is_eligible(r, blacklist))
            .collect();

        let mut report = DetectionReport {
            eligible: eligible.len(),
            excluded: total - eligible.len(),
            ..Default::default()
        };

        if eligible.len() < self.min_history_rows {
            debug!(
                eligible = eligible.len(),
                required = self.min_history_rows,
                "Not enough history for outlier detection"
            );
            report.skipped = true;
            return report;
        }

        let features: Vec<[f64; 3]> = eligible.iter().map(TokenRecord::features).collect();
        let predictions = self.forest.fit_predict(&features);

        report.outliers = eligible
            .into_iter()
            .zip(predictions)
            .filter(|(_, p)| p.outlier)
            .map(|(record, p)| Outlier {
                record,
                score: p.score,
            })
            .collect();

        info!(
            eligible = report.eligible,
            excluded = report.excluded,
            outliers = report.outliers.len(),
            "Outlier detection complete"
        );

        report
    }
}
