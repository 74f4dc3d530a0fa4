// Outbound notifications - Telegram Bot API or log-only for dry runs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::store::TokenRecord;

const SERVICE: &str = "telegram";

/// Message announcing the trade triggered by an outlier
pub fn trade_intent_message(record: &TokenRecord) -> String {
    format!("🚀 Buying {} ({}) at ${}", record.name, record.symbol, record.price)
}

pub const CYCLE_COMPLETED_MESSAGE: &str = "✅ Bot cycle completed.";

/// Text message sink with a fixed destination
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            return Err(Error::Config(
                "telegram.bot_token and telegram.chat_id are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            // reqwest errors carry the URL, which contains the bot token
            .map_err(|e| Error::http(SERVICE, e.without_url()))?;

        if !resp.status().is_success() {
            return Err(Error::HttpStatus {
                service: SERVICE.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body: ApiResponse = resp.json().await.map_err(|e| Error::MalformedPayload {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;
        if !body.ok {
            return Err(Error::Notify(
                body.description
                    .unwrap_or_else(|| "sendMessage rejected".to_string()),
            ));
        }

        debug!("Telegram message delivered");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        info!(notifier = "log", "{}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[test]
    fn test_trade_intent_message() {
        let mut r = record("Mint1");
        r.name = "Alpha".into();
        r.symbol = "ALP".into();
        r.price = 0.0025;
        assert_eq!(trade_intent_message(&r), "🚀 Buying Alpha (ALP) at $0.0025");
    }

    #[test]
    fn test_telegram_requires_credentials() {
        let config = TelegramConfig::default();
        assert!(matches!(TelegramNotifier::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_telegram_endpoint() {
        let config = TelegramConfig {
            api_base: "https://api.telegram.org/".into(),
            bot_token: "123:abc".into(),
            chat_id: "42".into(),
            ..Default::default()
        };
        let notifier = TelegramNotifier::new(&config).unwrap();
        assert_eq!(notifier.endpoint, "https://api.telegram.org/bot123:abc/sendMessage");
    }

    #[test]
    fn test_log_notifier_never_fails() {
        assert!(tokio_test::block_on(LogNotifier.send(CYCLE_COMPLETED_MESSAGE)).is_ok());
    }
}
