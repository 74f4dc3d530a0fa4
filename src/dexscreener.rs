// DexScreener API client - market data source for each cycle
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::MarketDataConfig;
use crate::error::{Error, Result};
use crate::filter::types::{TokenCandidate, UNKNOWN_DEVELOPER};

const SERVICE: &str = "dexscreener";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChange {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseToken {
    pub address: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(rename = "chainId", default)]
    pub chain_id: String,
    #[serde(rename = "dexId", default)]
    pub dex_id: String,
    #[serde(rename = "pairAddress", default)]
    pub pair_address: String,
    #[serde(rename = "baseToken", default)]
    pub base_token: BaseToken,
    #[serde(rename = "priceUsd")]
    pub price_usd: Option<String>,
    #[serde(rename = "priceChange")]
    pub price_change: Option<PriceChange>,
    pub volume: Option<Volume>,
    pub liquidity: Option<Liquidity>,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<f64>,
    pub fdv: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsResponse {
    pub pairs: Option<Vec<DexPair>>,
    /// Single-pair lookups sometimes answer with `pair` instead of `pairs`
    pub pair: Option<DexPair>,
}

impl PairsResponse {
    fn into_pairs(self) -> Vec<DexPair> {
        let mut pairs = self.pairs.unwrap_or_default();
        if let Some(pair) = self.pair {
            pairs.push(pair);
        }
        pairs
    }
}

impl TryFrom<&DexPair> for TokenCandidate {
    type Error = String;

    fn try_from(pair: &DexPair) -> std::result::Result<Self, Self::Error> {
        let address = pair
            .base_token
            .address
            .as_ref()
            .filter(|a| !a.is_empty())
            .ok_or("missing baseToken.address")?;
        let liquidity_usd = pair
            .liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .ok_or("missing liquidity.usd")?;
        let price_change_24h_pct = pair
            .price_change
            .as_ref()
            .and_then(|pc| pc.h24)
            .ok_or("missing priceChange.h24")?;
        let market_cap_usd = pair.fdv.ok_or("missing fdv")?;

        let price_usd = pair
            .price_usd
            .as_ref()
            .and_then(|p| p.parse::<f64>().ok())
            .unwrap_or(0.0);
        let volume_24h_usd = pair.volume.as_ref().and_then(|v| v.h24).unwrap_or(0.0);

        Ok(TokenCandidate {
            address: address.clone(),
            name: pair
                .base_token
                .name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            symbol: pair
                .base_token
                .symbol
                .clone()
                .unwrap_or_else(|| "???".to_string()),
            // Not exposed by the aggregator
            developer: UNKNOWN_DEVELOPER.to_string(),
            price_usd,
            market_cap_usd,
            liquidity_usd,
            volume_24h_usd,
            price_change_24h_pct,
        })
    }
}

/// Candidates decoded from one market-data response
#[derive(Debug, Default)]
pub struct MarketBatch {
    pub candidates: Vec<TokenCandidate>,
    /// Records skipped because required fields were missing
    pub malformed: usize,
}

impl MarketBatch {
    pub fn from_pairs(pairs: &[DexPair]) -> Self {
        let mut batch = MarketBatch::default();
        for pair in pairs {
            match TokenCandidate::try_from(pair) {
                Ok(candidate) => batch.candidates.push(candidate),
                Err(reason) => {
                    warn!(
                        "Skipping malformed pair {} ({}): {}",
                        pair.pair_address,
                        pair.base_token.address.as_deref().unwrap_or("-"),
                        reason
                    );
                    batch.malformed += 1;
                }
            }
        }
        batch
    }
}

/// Source of raw token records for a cycle
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_candidates(&self) -> Result<MarketBatch>;
}

pub struct DexScreenerClient {
    client: Client,
    base_url: String,
    chain_id: String,
}

impl DexScreenerClient {
    pub fn new(config: &MarketDataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chain_id: config.chain_id.clone(),
        })
    }

    async fn get_pairs(&self, url: &str) -> Result<Vec<DexPair>> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(Error::HttpStatus {
                service: SERVICE.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let data: PairsResponse = resp.json().await.map_err(|e| Error::MalformedPayload {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;
        Ok(data.into_pairs())
    }

    fn chain_url(&self) -> String {
        format!("{}/tokens/{}", self.base_url, self.chain_id)
    }

    fn token_url(&self, token_address: &str) -> String {
        format!("{}/tokens/{}/{}", self.base_url, self.chain_id, token_address)
    }

    fn pair_url(&self, pair_address: &str) -> String {
        format!("{}/pairs/{}/{}", self.base_url, self.chain_id, pair_address)
    }

    /// Fetch top pairs for the configured chain
    pub async fn get_chain_pairs(&self) -> Result<Vec<DexPair>> {
        self.get_pairs(&self.chain_url()).await
    }

    /// Fetch pairs for a single token
    pub async fn get_token_pairs(&self, token_address: &str) -> Result<Vec<DexPair>> {
        self.get_pairs(&self.token_url(token_address)).await
    }

    /// Fetch a single pair by pair address
    pub async fn get_pair(&self, pair_address: &str) -> Result<Option<DexPair>> {
        Ok(self.get_pairs(&self.pair_url(pair_address)).await?.into_iter().next())
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    async fn fetch_candidates(&self) -> Result<MarketBatch> {
        let pairs = self.get_chain_pairs().await?;
        Ok(MarketBatch::from_pairs(&pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "solana",
                "dexId": "raydium",
                "pairAddress": "Pair1",
                "baseToken": {"address": "Mint1", "name": "Alpha", "symbol": "ALP"},
                "priceUsd": "0.001234",
                "priceChange": {"h24": 2.5},
                "volume": {"h24": 200000.0},
                "liquidity": {"usd": 50000.0},
                "fdv": 500000.0
            },
            {
                "chainId": "solana",
                "dexId": "raydium",
                "pairAddress": "Pair2",
                "baseToken": {"address": "Mint2", "name": "Beta", "symbol": "BET"},
                "priceUsd": "1.5",
                "priceChange": {"h24": -3.0},
                "volume": {"h24": 1000.0},
                "fdv": 900000.0
            }
        ]
    }"#;

    #[test]
    fn test_decode_pairs() {
        let resp: PairsResponse = serde_json::from_str(PAYLOAD).unwrap();
        let batch = MarketBatch::from_pairs(&resp.into_pairs());

        assert_eq!(batch.candidates.len(), 1);
        assert_eq!(batch.malformed, 1);

        let c = &batch.candidates[0];
        assert_eq!(c.address, "Mint1");
        assert_eq!(c.symbol, "ALP");
        assert_eq!(c.developer, UNKNOWN_DEVELOPER);
        assert_eq!(c.price_usd, 0.001234);
        assert_eq!(c.market_cap_usd, 500_000.0);
        assert_eq!(c.liquidity_usd, 50_000.0);
        assert_eq!(c.volume_24h_usd, 200_000.0);
        assert_eq!(c.price_change_24h_pct, 2.5);
    }

    #[test]
    fn test_pair_without_address_is_skipped() {
        let resp: PairsResponse = serde_json::from_str(
            r#"{"pairs": [
                {"pairAddress": "P1", "baseToken": {"address": "Mint1", "name": "Alpha"},
                 "priceChange": {"h24": 1.0}, "liquidity": {"usd": 20000.0}, "fdv": 300000.0},
                {"pairAddress": "P2", "baseToken": {"name": "NoAddr"},
                 "priceChange": {"h24": 1.0}, "liquidity": {"usd": 20000.0}, "fdv": 300000.0},
                {"pairAddress": "P3",
                 "priceChange": {"h24": 1.0}, "liquidity": {"usd": 20000.0}, "fdv": 300000.0}
            ]}"#,
        )
        .unwrap();

        let batch = MarketBatch::from_pairs(&resp.into_pairs());
        assert_eq!(batch.candidates.len(), 1);
        assert_eq!(batch.candidates[0].address, "Mint1");
        assert_eq!(batch.malformed, 2);
    }

    #[test]
    fn test_lookup_urls() {
        let client = DexScreenerClient::new(&MarketDataConfig {
            base_url: "https://api.dexscreener.com/latest/dex/".into(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(client.chain_url(), "https://api.dexscreener.com/latest/dex/tokens/solana");
        assert_eq!(
            client.token_url("Mint1"),
            "https://api.dexscreener.com/latest/dex/tokens/solana/Mint1"
        );
        assert_eq!(
            client.pair_url("Pair1"),
            "https://api.dexscreener.com/latest/dex/pairs/solana/Pair1"
        );
    }

    #[test]
    fn test_null_pairs_is_empty() {
        let resp: PairsResponse = serde_json::from_str(r#"{"pairs": null}"#).unwrap();
        assert!(resp.into_pairs().is_empty());
    }

    #[test]
    fn test_single_pair_response() {
        let resp: PairsResponse = serde_json::from_str(
            r#"{"pair": {"baseToken": {"address": "Mint9"}, "priceChange": {"h24": 0.0},
                "liquidity": {"usd": 1.0}, "fdv": 2.0}}"#,
        )
        .unwrap();
        let batch = MarketBatch::from_pairs(&resp.into_pairs());
        assert_eq!(batch.candidates.len(), 1);
        assert_eq!(batch.candidates[0].name, "Unknown");
        assert_eq!(batch.candidates[0].price_usd, 0.0);
    }
}
