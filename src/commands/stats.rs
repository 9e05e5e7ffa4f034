use anyhow::Result;
use colored::Colorize;
use std::{path::Path, sync::Arc};
use translator_bot::{
    config, init_tracing,
    stats::{self, StatsReporter},
    store::SqliteTranslationStore,
};

/// Execute the stats command
///
/// Prints the same report `/stats` sends, or the raw numbers as JSON.
pub async fn execute(config_path: &Path, json: bool) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let _guard = init_tracing(&cfg.logging);

    let store = Arc::new(
        SqliteTranslationStore::connect(&cfg.database.url, cfg.database.max_connections).await?,
    );
    let reporter = StatsReporter::new(store.clone());
    let collected = reporter.collect().await;
    store.pool().close().await;
    let collected = collected?;

    if json {
        println!("{}", serde_json::to_string_pretty(&collected)?);
    } else {
        println!("{}", format!("Database: {}", cfg.database.url).dimmed());
        println!();
        println!("{}", stats::render(&collected));
    }

    Ok(())
}
