use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tracing::info;
use translator_bot::{config, init_tracing, server};

/// Execute the start command
///
/// Loads configuration, initializes logging and runs the bot until shutdown.
pub async fn execute(config_path: &Path) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let _guard = init_tracing(&cfg.logging);

    println!(
        "{} ({} mode)",
        "Starting translator bot...".green(),
        format!("{:?}", cfg.telegram.mode).to_lowercase()
    );
    info!(config = %config_path.display(), "Configuration loaded");

    server::start_server(cfg).await
}
