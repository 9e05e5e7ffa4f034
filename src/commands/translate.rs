use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use translator_bot::{config, init_tracing, server};

/// Execute the translate command
///
/// Runs one lookup through the same cache the bot uses, so the
/// view counter and stored translations are shared with it.
pub async fn execute(config_path: &Path, text: &str) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let _guard = init_tracing(&cfg.logging);

    let components = server::build_components(&cfg).await?;
    let result = components.service.get_translation(text).await;
    components.store.pool().close().await;

    match result? {
        Some(record) => {
            println!("{} {}", "Source:".cyan(), record.source);
            println!("{} {}", "Views:".cyan(), record.view_count);
            println!();
            println!("{}", record.translation);
        }
        None => {
            println!("{}", "Nothing to translate".yellow());
        }
    }

    Ok(())
}
