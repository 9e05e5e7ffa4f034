pub mod auth;
pub mod bot;
pub mod completion;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod providers;
pub mod server;
pub mod service;
pub mod signals;
pub mod stats;
pub mod store;
pub mod telegram;

use crate::config::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the daily-rolling log file
const LOG_FILE_PREFIX: &str = "translator-bot.log";

/// Initialize tracing/logging
///
/// `RUST_LOG` takes precedence over `logging.level`. When `logging.file` is
/// set, JSON lines are also written to a daily-rolling file in that directory;
/// keep the returned guard alive so buffered lines get flushed.
///
/// Note: This function can only be called once.
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console_layer = match config.format {
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
    };

    let (file_layer, guard) = match config.file.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
