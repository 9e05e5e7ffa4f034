use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use translator_bot::{
    config::{self, Config},
    logging::SensitiveValue,
};

/// Execute the config show command
///
/// Displays the current configuration with secrets masked
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());

    let cfg = config::load_config(config_path)?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    Ok(())
}

/// Mask the bot token, API key and webhook secret for safe display
fn sanitize_secrets(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();

    sanitized.telegram.bot_token = SensitiveValue::new(&cfg.telegram.bot_token).to_string();
    sanitized.completion.api_key = SensitiveValue::new(&cfg.completion.api_key).to_string();
    if !cfg.webhook.secret_token.is_empty() {
        sanitized.webhook.secret_token = SensitiveValue::new(&cfg.webhook.secret_token).to_string();
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use translator_bot::config::{
        AccessConfig, CompletionConfig, DatabaseConfig, DeliveryMode, LoggingConfig, TelegramConfig,
        WebhookConfig,
    };

    fn sample_config() -> Config {
        Config {
            telegram: TelegramConfig {
                bot_token: "123456789:AAE-very-secret-token".to_string(),
                api_base_url: "https://api.telegram.org".to_string(),
                mode: DeliveryMode::Webhook,
                poll_timeout_seconds: 30,
                max_concurrent_updates: 8,
            },
            webhook: WebhookConfig {
                secret_token: "webhook-secret-value".to_string(),
                ..WebhookConfig::default()
            },
            access: AccessConfig {
                allowed_users: vec![42],
            },
            completion: CompletionConfig {
                api_key: "sk-proj-abcdef123456".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o".to_string(),
                temperature: 0.2,
                max_tokens: 1000,
                timeout_seconds: 30,
                target_language: "ru".to_string(),
            },
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_sanitize_secrets() {
        let sanitized = sanitize_secrets(&sample_config());

        assert_eq!(sanitized.telegram.bot_token, "123456***");
        assert_eq!(sanitized.completion.api_key, "sk-pro***");
        assert_eq!(sanitized.webhook.secret_token, "webhoo***");
        assert_eq!(sanitized.completion.model, "gpt-4o");
    }

    #[test]
    fn test_sanitized_config_serializes_to_toml() {
        let toml_string = toml::to_string_pretty(&sanitize_secrets(&sample_config())).unwrap();

        assert!(toml_string.contains("[telegram]"));
        assert!(!toml_string.contains("very-secret"));
        assert!(!toml_string.contains("abcdef123456"));
    }
}
