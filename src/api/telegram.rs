use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, TradingError};
use crate::notify::Notifier;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            base_url: TELEGRAM_API_BASE.to_string(),
            timeout_secs: 10,
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.bot_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.chat_id.as_deref().is_some_and(|c| !c.is_empty())
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends notifications to a single Telegram chat via the Bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, TradingError> {
        let (token, chat_id) = match (&config.bot_token, &config.chat_id) {
            (Some(token), Some(chat_id)) if config.is_configured() => (token, chat_id),
            _ => {
                return Err(TradingError::Config(
                    "telegram bot_token and chat_id are both required".to_string(),
                ))
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TradingError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", config.base_url.trim_end_matches('/'), token),
            chat_id: chat_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base_url: &str) -> TelegramConfig {
        TelegramConfig {
            bot_token: Some("123:abc".to_string()),
            chat_id: Some("-100200".to_string()),
            base_url: base_url.to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_requires_token_and_chat() {
        assert!(TelegramNotifier::new(&TelegramConfig::default()).is_err());

        let mut partial = config("http://localhost");
        partial.chat_id = Some(String::new());
        assert!(!partial.is_configured());
        assert!(TelegramNotifier::new(&partial).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        assert!(!format!("{:?}", config("http://localhost")).contains("123:abc"));
    }

    #[tokio::test]
    async fn test_send_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::Json(serde_json::json!({
                "chat_id": "-100200",
                "text": "🚀 LONG BTCUSDT placed"
            })))
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new(&config(&server.url())).unwrap();
        notifier.send("🚀 LONG BTCUSDT placed").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_is_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok": false, "description": "Forbidden"}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new(&config(&server.url())).unwrap();
        let err = notifier.send("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(403)));
    }
}
