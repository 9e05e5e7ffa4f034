use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{
    future::Future,
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::{
    auth::{self, AccessControl},
    bot::Bot,
    completion::CompletionClient,
    config::{Config, DeliveryMode},
    error::AppError,
    models::telegram::Update,
    service::TranslationService,
    signals::{setup_signal_handlers, ShutdownSignal},
    stats::StatsReporter,
    store::{SqliteTranslationStore, TranslationStore},
    telegram::{
        polling::{run_polling, PollingOptions},
        TelegramClient,
    },
};

/// Fully wired application
pub struct Components {
    pub store: Arc<SqliteTranslationStore>,
    pub service: Arc<TranslationService>,
    pub stats: Arc<StatsReporter>,
    pub telegram: TelegramClient,
    pub bot: Arc<Bot>,
}

/// Open the database and wire the service, reporter and bot together
pub async fn build_components(config: &Config) -> Result<Components> {
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("translator-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let store = Arc::new(
        SqliteTranslationStore::connect(&config.database.url, config.database.max_connections).await?,
    );
    let dyn_store: Arc<dyn TranslationStore> = store.clone();

    let translator = Arc::new(CompletionClient::new(http_client.clone(), config.completion.clone()));
    let service = Arc::new(TranslationService::new(
        dyn_store.clone(),
        translator,
        config.completion.target_language.clone(),
    ));
    let stats = Arc::new(StatsReporter::new(dyn_store));
    let telegram = TelegramClient::new(http_client, &config.telegram);
    let bot = Arc::new(Bot::new(
        service.clone(),
        stats.clone(),
        AccessControl::from_config(&config.access),
        telegram.clone(),
    ));

    Ok(Components {
        store,
        service,
        stats,
        telegram,
        bot,
    })
}

/// Run the bot until SIGINT/SIGTERM
///
/// Polling mode long-polls `getUpdates`; webhook mode serves the webhook
/// endpoint and optionally registers it with Telegram first.
pub async fn start_server(config: Config) -> Result<()> {
    let components = build_components(&config).await?;

    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let shutdown_rx = shutdown_tx.subscribe();

    info!(
        mode = ?config.telegram.mode,
        model = %config.completion.model,
        target_language = %config.completion.target_language,
        allowed_users = config.access.allowed_users.len(),
        "Starting translator bot"
    );

    match config.telegram.mode {
        DeliveryMode::Polling => {
            let options = PollingOptions {
                timeout_seconds: config.telegram.poll_timeout_seconds,
                max_concurrent_updates: config.telegram.max_concurrent_updates,
            };
            run_polling(components.telegram.clone(), components.bot.clone(), options, shutdown_rx).await;
        }
        DeliveryMode::Webhook => {
            serve_webhook(&config, &components, shutdown_rx).await?;
        }
    }

    signal_handle.abort();
    components.store.pool().close().await;
    info!("Bot stopped gracefully");

    Ok(())
}

async fn serve_webhook(
    config: &Config,
    components: &Components,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<ShutdownSignal>,
) -> Result<()> {
    let webhook = &config.webhook;

    if let Some(public_url) = webhook.public_url.as_deref() {
        let url = format!("{}{}", public_url.trim_end_matches('/'), webhook.path);
        components
            .telegram
            .set_webhook(&url, &webhook.secret_token)
            .await
            .context("Failed to register webhook")?;
        info!("Webhook registered at {}", url);
    } else {
        warn!("webhook.public_url is not set, assuming the webhook is registered externally");
    }

    let state = AppState {
        bot: components.bot.clone(),
        secret_token: Arc::from(webhook.secret_token.as_str()),
        in_flight: UpdateTasks::default(),
    };
    let in_flight = state.in_flight.clone();
    let app = create_router(state, &webhook.path);

    let addr = SocketAddr::from((webhook.host.parse::<std::net::IpAddr>()?, webhook.port));
    info!("Listening for webhook updates on {}{}", addr, webhook.path);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    // Updates accepted before shutdown still need the database
    in_flight.drain().await;

    Ok(())
}

/// Shared state of the webhook server
#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
    pub secret_token: Arc<str>,
    pub in_flight: UpdateTasks,
}

/// Updates accepted by the webhook and still being handled
#[derive(Clone, Default)]
pub struct UpdateTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl UpdateTasks {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        // Reap finished handlers so the set only holds live ones
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Number of handlers that have not finished yet
    pub fn len(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every accepted update to finish
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        if !tasks.is_empty() {
            info!(pending = tasks.len(), "Waiting for in-flight updates");
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Update handler failed");
            }
        }
    }
}

/// Create the Axum router with the webhook and health routes
pub fn create_router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(webhook_path, post(handle_webhook))
        .with_state(state)
        // Telegram updates are small; cap the body size
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Accept one update pushed by Telegram
///
/// The update is handled in the background so Telegram gets its 200 right away
/// and does not redeliver slow translations. Shutdown waits for it.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    auth::verify_secret_token(&headers, &state.secret_token)?;

    let update: Update = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid update: {}", e)))?;

    debug!(update_id = update.update_id, "Webhook update received");

    let bot = state.bot.clone();
    state.in_flight.spawn(async move {
        bot.handle_update(update).await;
    });

    Ok(Json(json!({ "ok": true })))
}
