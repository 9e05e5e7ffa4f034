use crate::{bot::Bot, signals::ShutdownSignal, telegram::TelegramClient};
use futures::stream::{self, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Pause after a failed `getUpdates` call
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Long-polling settings
#[derive(Debug, Clone, Copy)]
pub struct PollingOptions {
    pub timeout_seconds: u64,
    pub max_concurrent_updates: usize,
}

/// Receive updates with `getUpdates` until a shutdown signal arrives
///
/// Any registered webhook is removed first since Telegram refuses
/// `getUpdates` while one is active. Each batch is handled with bounded
/// concurrency and acknowledged by advancing the offset past it.
pub async fn run_polling(
    telegram: TelegramClient,
    bot: Arc<Bot>,
    options: PollingOptions,
    mut shutdown_rx: broadcast::Receiver<ShutdownSignal>,
) {
    if let Err(e) = telegram.delete_webhook().await {
        warn!("Failed to delete webhook before polling: {}", e);
    }

    info!(
        timeout_seconds = options.timeout_seconds,
        max_concurrent_updates = options.max_concurrent_updates,
        "Polling for updates"
    );

    let mut offset: Option<i64> = None;

    loop {
        let updates = tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping polling");
                break;
            }
            result = telegram.get_updates(offset, options.timeout_seconds) => result,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                error!("Failed to fetch updates: {}", e);
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => continue,
                }
            }
        };

        if updates.is_empty() {
            continue;
        }

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            offset = Some(last + 1);
        }
        debug!(count = updates.len(), next_offset = ?offset, "Received updates");

        stream::iter(updates)
            .for_each_concurrent(options.max_concurrent_updates.max(1), |update| {
                let bot = bot.clone();
                async move { bot.handle_update(update).await }
            })
            .await;
    }
}
