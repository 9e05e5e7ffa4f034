use crate::{
    config::TelegramConfig,
    error::TelegramError,
    models::telegram::{
        ApiResponse, GetUpdatesRequest, SendMessageRequest, SetWebhookRequest, Update,
    },
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest text a single Telegram message may carry
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Timeout for calls other than long polling
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Parse mode used for rich replies
const RICH_PARSE_MODE: &str = "Markdown";

/// Minimal Telegram Bot API client
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http_client: Client,
    /// `{api_base_url}/bot{token}`
    endpoint: String,
}

impl TelegramClient {
    pub fn new(http_client: Client, config: &TelegramConfig) -> Self {
        Self {
            http_client,
            endpoint: format!(
                "{}/bot{}",
                config.api_base_url.trim_end_matches('/'),
                config.bot_token
            ),
        }
    }

    async fn call<P, T>(&self, method: &str, params: &P, timeout: Duration) -> Result<T, TelegramError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint, method);

        // Errors come back as an `ok: false` envelope with a 4xx status
        let envelope: ApiResponse<T> = self
            .http_client
            .post(&url)
            .timeout(timeout)
            .json(params)
            .send()
            .await?
            .json()
            .await?;

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                error_code,
                description,
                ..
            } => Err(TelegramError::Api {
                code: error_code.unwrap_or_default(),
                description: description.unwrap_or_else(|| "Unknown error".to_string()),
            }),
        }
    }

    /// Long-poll for new message updates
    pub async fn get_updates(&self, offset: Option<i64>, timeout_seconds: u64) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesRequest {
            offset,
            timeout: timeout_seconds,
            allowed_updates: vec!["message".to_string()],
        };

        // Leave room for the server-side wait
        let timeout = Duration::from_secs(timeout_seconds) + Duration::from_secs(10);
        self.call("getUpdates", &params, timeout).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, parse_mode: Option<&str>) -> Result<(), TelegramError> {
        let params = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
        };

        let _: serde_json::Value = self.call("sendMessage", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    /// Send a possibly long reply, split into Telegram-sized chunks
    ///
    /// Rich chunks rejected for bad Markdown are resent as plain text.
    pub async fn send_reply(&self, chat_id: i64, text: &str, rich_text: bool) -> Result<(), TelegramError> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            if !rich_text {
                self.send_message(chat_id, &chunk, None).await?;
                continue;
            }

            match self.send_message(chat_id, &chunk, Some(RICH_PARSE_MODE)).await {
                Err(e) if e.is_parse_entities_error() => {
                    warn!(chat_id, error = %e, "Markdown rejected, resending as plain text");
                    self.send_message(chat_id, &chunk, None).await?;
                }
                other => other?,
            }
        }

        Ok(())
    }

    pub async fn set_webhook(&self, url: &str, secret_token: &str) -> Result<(), TelegramError> {
        let params = SetWebhookRequest {
            url,
            secret_token,
            allowed_updates: vec!["message".to_string()],
        };

        let _: bool = self.call("setWebhook", &params, REQUEST_TIMEOUT).await?;
        debug!("Webhook registered");
        Ok(())
    }

    pub async fn delete_webhook(&self) -> Result<(), TelegramError> {
        let _: bool = self
            .call("deleteWebhook", &serde_json::json!({}), REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }
}

/// Split `text` into chunks of at most `limit` characters, preferring line breaks
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            // A single line longer than the limit is cut by characters
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                let piece: String = piece.iter().collect();
                if piece.chars().count() == limit {
                    chunks.push(piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
