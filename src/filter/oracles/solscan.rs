//! Solscan token metadata client (mint / freeze authority lookup)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::AuthorityConfig;
use crate::error::{Error, Result};

use super::{AuthorityOracle, TokenAuthorities};

const SERVICE: &str = "solscan";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenMeta {
    mint_authority: Option<String>,
    freeze_authority: Option<String>,
}

pub struct SolscanClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SolscanClient {
    pub fn new(config: &AuthorityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl AuthorityOracle for SolscanClient {
    async fn authorities(&self, token_address: &str) -> Result<TokenAuthorities> {
        let url = format!("{}/token/{}", self.base_url, token_address);
        debug!("Fetching token authorities for {}", token_address);

        let mut request = self.client.get(&url);
        if !self.api_key.is_empty() {
            request = request.header("token", &self.api_key);
        }

        let response = request.send().await.map_err(|e| Error::http(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            });
        }

        let meta: TokenMeta = response.json().await.map_err(|e| Error::MalformedPayload {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;

        Ok(TokenAuthorities {
            mint_authority: meta.mint_authority,
            freeze_authority: meta.freeze_authority,
        })
    }
}
