//! In-memory collaborators for unit tests

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::dexscreener::{MarketBatch, MarketDataSource};
use crate::error::{Error, Result};
use crate::filter::oracles::{AuthorityOracle, ReputationOracle, TokenAuthorities, WashTradingOracle};
use crate::filter::types::TokenCandidate;
use crate::notify::Notifier;
use crate::store::TokenRecord;

fn outage(service: &str) -> Error {
    Error::HttpStatus {
        service: service.to_string(),
        status: 503,
    }
}

/// Candidate that clears every threshold and the fake-volume heuristic
pub fn candidate(address: &str, developer: &str) -> TokenCandidate {
    TokenCandidate {
        address: address.to_string(),
        name: format!("Token {}", address),
        symbol: address.chars().take(4).collect::<String>().to_uppercase(),
        developer: developer.to_string(),
        price_usd: 0.01,
        market_cap_usd: 500_000.0,
        liquidity_usd: 50_000.0,
        volume_24h_usd: 200_000.0,
        price_change_24h_pct: 2.0,
    }
}

/// Clean history row
pub fn record(address: &str) -> TokenRecord {
    TokenRecord {
        id: None,
        address: address.to_string(),
        name: format!("Token {}", address),
        symbol: "TKN".to_string(),
        developer: "unknown".to_string(),
        price: 1.0,
        market_cap: 500_000.0,
        liquidity: 50_000.0,
        volume: 200_000.0,
        price_change_24h: 2.0,
        is_rugged: false,
        has_fake_volume: false,
        rugcheck_status: "good".to_string(),
        is_bundled_supply: false,
        recorded_at: Utc::now(),
    }
}

pub struct FakeReputation {
    answer: Option<Option<f64>>,
    calls: AtomicUsize,
}

impl FakeReputation {
    pub fn score(score: f64) -> Self {
        Self {
            answer: Some(Some(score)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            answer: Some(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReputationOracle for FakeReputation {
    async fn risk_score(&self, _token_address: &str) -> Result<Option<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.ok_or_else(|| outage("rugcheck"))
    }
}

pub struct FakeAuthority {
    answer: Option<TokenAuthorities>,
    calls: AtomicUsize,
}

impl FakeAuthority {
    pub fn distinct() -> Self {
        Self::fixed(TokenAuthorities {
            mint_authority: Some("MintAuthority1".to_string()),
            freeze_authority: Some("FreezeAuthority1".to_string()),
        })
    }

    pub fn fixed(authorities: TokenAuthorities) -> Self {
        Self {
            answer: Some(authorities),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorityOracle for FakeAuthority {
    async fn authorities(&self, _token_address: &str) -> Result<TokenAuthorities> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().ok_or_else(|| outage("solscan"))
    }
}

pub struct FakeWashTrading {
    answer: Option<bool>,
    calls: AtomicUsize,
}

impl FakeWashTrading {
    pub fn flag(is_wash_trading: bool) -> Self {
        Self {
            answer: Some(is_wash_trading),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WashTradingOracle for FakeWashTrading {
    async fn is_wash_trading(&self, _token_address: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.ok_or_else(|| outage("pocket_universe"))
    }
}

/// Market source serving a replaceable candidate list
#[derive(Default)]
pub struct FakeMarket {
    candidates: Mutex<Vec<TokenCandidate>>,
    down: bool,
    stalled: bool,
}

impl FakeMarket {
    pub fn new(candidates: Vec<TokenCandidate>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
            ..Default::default()
        }
    }

    pub fn down() -> Self {
        Self {
            down: true,
            ..Default::default()
        }
    }

    /// Fetch never completes
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Default::default()
        }
    }

    pub fn set(&self, candidates: Vec<TokenCandidate>) {
        *self.candidates.lock().unwrap() = candidates;
    }
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    async fn fetch_candidates(&self) -> Result<MarketBatch> {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        if self.down {
            return Err(outage("dexscreener"));
        }
        Ok(MarketBatch {
            candidates: self.candidates.lock().unwrap().clone(),
            malformed: 0,
        })
    }
}

/// Notifier that keeps every message it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
