use serde::{de, Deserialize, Deserializer, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    pub access: AccessConfig,
    pub completion: CompletionConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Long-poll `getUpdates`
    Polling,
    /// Receive updates on the built-in HTTP server
    Webhook,
}

impl Default for DeliveryMode {
    fn default() -> Self {
        Self::Polling
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub bot_token: String,

    #[serde(default = "default_telegram_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub mode: DeliveryMode,

    /// Long-poll timeout passed to `getUpdates`
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u64,

    /// Upper bound of updates handled at the same time while polling
    #[serde(default = "default_max_concurrent_updates")]
    pub max_concurrent_updates: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_host")]
    pub host: String,

    #[serde(default = "default_webhook_port")]
    pub port: u16,

    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// Value Telegram echoes in `X-Telegram-Bot-Api-Secret-Token`
    #[serde(default)]
    pub secret_token: String,

    /// Externally reachable URL; when set, the webhook is registered at start-up
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_webhook_host(),
            port: default_webhook_port(),
            path: default_webhook_path(),
            secret_token: String::new(),
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessConfig {
    /// Telegram user ids allowed to use the bot
    #[serde(deserialize_with = "deserialize_user_ids")]
    pub allowed_users: Vec<i64>,
}

/// Accept a single id, a list of ids, or a comma separated string
///
/// A one-element env override such as `ALLOWED_USERS=111` reaches serde as a
/// bare integer rather than a sequence.
fn deserialize_user_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UserId {
        Number(i64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UserIds {
        One(UserId),
        Many(Vec<UserId>),
    }

    let ids = match UserIds::deserialize(deserializer)? {
        UserIds::One(id) => vec![id],
        UserIds::Many(ids) => ids,
    };

    let mut parsed = Vec::with_capacity(ids.len());
    for id in ids {
        match id {
            UserId::Number(n) => parsed.push(n),
            UserId::Text(text) => {
                for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let n = part
                        .parse::<i64>()
                        .map_err(|_| de::Error::custom(format!("invalid user id: {}", part)))?;
                    parsed.push(n);
                }
            }
        }
    }

    Ok(parsed)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionConfig {
    pub api_key: String,

    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_completion_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_target_language")]
    pub target_language: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite connection string (e.g. "sqlite:./data/translations.db")
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for a daily-rolling log file
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

fn default_telegram_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_max_concurrent_updates() -> usize {
    8
}

fn default_webhook_host() -> String {
    "0.0.0.0".to_string()
}

fn default_webhook_port() -> u16 {
    8080
}

fn default_webhook_path() -> String {
    "/telegram/webhook".to_string()
}

fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_completion_timeout() -> u64 {
    30
}

fn default_target_language() -> String {
    "ru".to_string()
}

fn default_database_url() -> String {
    "sqlite:./data/translations.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Load configuration from `path` layered with `TRANSLATOR_BOT__*` environment variables
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    load_config_with_env(path, environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("TRANSLATOR_BOT")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("access.allowed_users")
        .try_parsing(true)
}

fn load_config_with_env(path: &Path, env: config::Environment) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(env)
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.telegram.bot_token.trim().is_empty() {
        anyhow::bail!("Telegram bot token must be configured");
    }

    if cfg.telegram.max_concurrent_updates == 0 {
        anyhow::bail!("telegram.max_concurrent_updates must be >= 1");
    }

    if cfg.telegram.mode == DeliveryMode::Webhook {
        if cfg.webhook.secret_token.is_empty() {
            anyhow::bail!("Webhook mode requires webhook.secret_token");
        }
        if !cfg.webhook.path.starts_with('/') {
            anyhow::bail!("webhook.path must start with '/': {}", cfg.webhook.path);
        }
    }

    // Validate at least one user is allowed
    if cfg.access.allowed_users.is_empty() {
        anyhow::bail!("At least one allowed user must be configured");
    }

    if cfg.completion.api_key.trim().is_empty() {
        anyhow::bail!("Completion API key must be configured");
    }

    if cfg.completion.model.is_empty() {
        anyhow::bail!("Completion model cannot be empty");
    }

    if !(0.0..=2.0).contains(&cfg.completion.temperature) {
        anyhow::bail!(
            "Invalid completion temperature: {}. Must be between 0.0 and 2.0",
            cfg.completion.temperature
        );
    }

    if cfg.completion.timeout_seconds == 0 {
        anyhow::bail!("completion.timeout_seconds must be >= 1");
    }

    if !cfg.database.url.starts_with("sqlite:") {
        anyhow::bail!("Unsupported database url: {}", cfg.database.url);
    }

    if cfg.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn create_test_config() -> Config {
    Config {
        telegram: TelegramConfig {
            bot_token: "123456:ABC-test-token".to_string(),
            api_base_url: default_telegram_api_base_url(),
            mode: DeliveryMode::Polling,
            poll_timeout_seconds: 30,
            max_concurrent_updates: 8,
        },
        webhook: WebhookConfig::default(),
        access: AccessConfig {
            allowed_users: vec![42],
        },
        completion: CompletionConfig {
            api_key: "sk-test".to_string(),
            base_url: default_completion_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_completion_timeout(),
            target_language: default_target_language(),
        },
        database: DatabaseConfig::default(),
        logging: LoggingConfig::default(),
    }
}
