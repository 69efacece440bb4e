use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::TelegramConfig;
use crate::{Error, Result};

/// Text formatting mode for `sendMessage`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    MarkdownV2,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Minimal Telegram Bot API client
#[derive(Clone)]
pub struct TelegramBot {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramBot {
    pub fn new(api_base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config("telegram.bot_token is required".to_string()))?;

        Self::new(
            &config.api_base_url,
            token,
            Duration::from_secs(config.send_timeout_secs),
        )
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Send a text message to a chat or channel
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            disable_web_page_preview: false,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::Telegram(format!("sendMessage request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(api) if api.ok && status.is_success() => Ok(()),
            Ok(api) => Err(Error::Telegram(format!(
                "sendMessage failed ({}): {}",
                status,
                api.description.unwrap_or_else(|| "no description".to_string())
            ))),
            Err(_) => Err(Error::Telegram(format!(
                "sendMessage failed ({}): {}",
                status,
                body.trim()
            ))),
        }
    }
}
