//! RugCheck token analysis client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::RugCheckConfig;
use crate::error::{Error, Result};

use super::ReputationOracle;

const SERVICE: &str = "rugcheck";

#[derive(Debug, Deserialize)]
struct TokenAnalysis {
    risk_score: Option<f64>,
}

/// RugCheck API client
pub struct RugCheckClient {
    client: Client,
    url: String,
    api_key: String,
}

impl RugCheckClient {
    pub fn new(config: &RugCheckConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ReputationOracle for RugCheckClient {
    async fn risk_score(&self, token_address: &str) -> Result<Option<f64>> {
        debug!("Fetching RugCheck analysis for {}", token_address);

        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.api_key)
            .query(&[("token_address", token_address)])
            .send()
            .await
            .map_err(|e| Error::http(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            });
        }

        let analysis: TokenAnalysis = response.json().await.map_err(|e| Error::MalformedPayload {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;

        Ok(analysis.risk_score)
    }
}
