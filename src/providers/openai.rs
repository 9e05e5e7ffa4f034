use crate::{
    config::CompletionConfig,
    error::CompletionError,
    models::openai::{ChatCompletionRequest, ChatCompletionResponse},
};
use reqwest::Client;
use std::time::Duration;

/// Call OpenAI Chat Completions API
///
/// Returns the parsed body only when it matches the response schema.
pub async fn chat_completions(
    client: &Client,
    config: &CompletionConfig,
    request: &ChatCompletionRequest,
) -> Result<ChatCompletionResponse, CompletionError> {
    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(config.timeout_seconds))
        .json(request)
        .send()
        .await?;

    // Check for HTTP errors
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(CompletionError::Transport(format!("{}: {}", status, error_text)));
    }

    let body = response.bytes().await?;

    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| CompletionError::MalformedResponse(format!("JSON parsing error: {}", e)))?;

    serde_json::from_value(value)
        .map_err(|e| CompletionError::MalformedResponse(format!("Validation error: {}", e)))
}
