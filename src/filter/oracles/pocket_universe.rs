//! Pocket Universe wash-trading client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::WashTradingConfig;
use crate::error::{Error, Result};

use super::WashTradingOracle;

const SERVICE: &str = "pocket_universe";

#[derive(Debug, Deserialize)]
struct WashTradingCheck {
    #[serde(default)]
    is_wash_trading: bool,
}

pub struct PocketUniverseClient {
    client: Client,
    url: String,
    api_key: String,
}

impl PocketUniverseClient {
    pub fn new(config: &WashTradingConfig) -> Result<Self> {
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
impl WashTradingOracle for PocketUniverseClient {
    async fn is_wash_trading(&self, token_address: &str) -> Result<bool> {
        debug!("Checking wash trading for {}", token_address);

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

        let check: WashTradingCheck = response.json().await.map_err(|e| Error::MalformedPayload {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;

        Ok(check.is_wash_trading)
    }
}
