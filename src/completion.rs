//! Completion gateway
//!
//! Turns a text fragment into a Markdown translation with a single
//! chat-completion call. No caching, no retry: every call is one round trip.

use crate::{
    config::CompletionConfig,
    error::CompletionError,
    logging::preview,
    models::openai::{ChatCompletionRequest, ChatMessage},
    providers::openai,
};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Anything that can translate a text fragment
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, CompletionError>;
}

const SYSTEM_INSTRUCTION: &str = "You are a professional translator. \
Translate the user's text following the examples below. Include usage examples and the main meanings. \
Return the translation with Markdown markup only, without any additional comments, greetings or explanations.

Example for a word:

## Reliable – надёжный

\"Reliable\" can be translated depending on the context:

1. **Надёжный** (about people, devices or sources you can trust).
   Example: *a reliable friend* — *надёжный друг*.

2. **Достоверный** (about information or data).
   Example: *reliable data* — *достоверные данные*.

Without context the most common translation is **\"надёжный\"**.

----

Example for a phrase:

## Break the ice – растопить лёд

\"Break the ice\" is translated as:

1. **Растопить лёд** (to ease tension at the start of a conversation).
   Example: *He told a joke to break the ice.* — *Он пошутил, чтобы растопить лёд.*

2. **Разрядить обстановку** (a less literal rendering).
   Example: *The game helped break the ice.* — *Игра помогла разрядить обстановку.*

The most accurate translation is **\"растопить лёд\"**.
";

/// Human-readable language name for the prompt
pub fn language_name(code: &str) -> &str {
    match code.to_ascii_lowercase().as_str() {
        "ru" => "Russian",
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "uk" => "Ukrainian",
        "zh" => "Chinese",
        "ja" => "Japanese",
        _ => code,
    }
}

/// Build the two-message prompt for `text`
pub fn build_messages(text: &str, target_language: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        "Translate the following text to {}:\n\n---\n{}\n---",
        language_name(target_language),
        text
    );

    vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(prompt)]
}

/// Chat-completion backed translator
pub struct CompletionClient {
    http_client: Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(http_client: Client, config: CompletionConfig) -> Self {
        Self { http_client, config }
    }
}

#[async_trait]
impl Translator for CompletionClient {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, CompletionError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: build_messages(text, target_language),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(
            model = %request.model,
            text = %preview(text, 100),
            "Sending completion request"
        );

        let response = openai::chat_completions(&self.http_client, &self.config, &request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::Upstream("response contains no choices".to_string()))?;

        let translated = choice.message.content.trim().to_string();

        debug!(
            total_tokens = response.usage.total_tokens,
            finish_reason = %choice.finish_reason,
            translation = %preview(&translated, 100),
            "Received completion"
        );

        Ok(translated)
    }
}
