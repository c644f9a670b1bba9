use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use teloxide::prelude::*;
use teloxide::types::Update;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{redact, Config, POLL_TIMEOUT_SECS};
use crate::platform::telegram::convert_update;
use crate::platform::InboundEvent;

const EVENT_BUFFER: usize = 100;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Polling,
    Webhook,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Polling => write!(f, "polling"),
            TransportMode::Webhook => write!(f, "webhook"),
        }
    }
}

/// Ordered stream of inbound events, independent of how they arrive.
/// Closes once the producing task is gone.
pub struct EventSource {
    mode: TransportMode,
    events: mpsc::Receiver<InboundEvent>,
}

impl EventSource {
    pub fn channel(mode: TransportMode) -> (mpsc::Sender<InboundEvent>, Self) {
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        (tx, Self { mode, events })
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub async fn next(&mut self) -> Option<InboundEvent> {
        self.events.recv().await
    }
}

/// Pick webhooks when a public domain is configured, long polling otherwise.
pub async fn select(bot: &Bot, config: &Config) -> Result<EventSource> {
    match config.webhook_url() {
        Some(url) => start_webhook(bot, config, &url).await,
        None => {
            info!(
                "Unable to read domain for incoming requests. Set $DOMAIN to use webhooks. \
                 Falling back to polling"
            );
            Ok(start_polling(bot.clone()).await)
        }
    }
}

async fn start_polling(bot: Bot) -> EventSource {
    // getUpdates is refused while a webhook is registered.
    if let Err(e) = bot.delete_webhook().drop_pending_updates(false).await {
        warn!("Failed to delete webhook before polling: {}", e);
    }

    let (tx, source) = EventSource::channel(TransportMode::Polling);
    tokio::spawn(poll_updates(bot, tx));
    source
}

/// Long-poll forever. Starts at offset 0, so whatever Telegram still holds
/// from before a restart is delivered again.
async fn poll_updates(bot: Bot, tx: mpsc::Sender<InboundEvent>) {
    info!("Starting long polling (timeout {}s)", POLL_TIMEOUT_SECS);
    let mut offset: i32 = 0;

    loop {
        let result = bot
            .get_updates()
            .offset(offset)
            .timeout(POLL_TIMEOUT_SECS)
            .await;

        match result {
            Ok(updates) => {
                debug!("Got {} update(s)", updates.len());
                for update in updates {
                    offset = update.id.as_offset();
                    if tx.send(convert_update(update)).await.is_err() {
                        info!("Dispatcher gone, stopping polling");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("getUpdates failed: {}, retrying in {:?}", e, POLL_RETRY_DELAY);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
}

async fn start_webhook(bot: &Bot, config: &Config, url: &str) -> Result<EventSource> {
    if let Some(domain) = &config.domain {
        info!("Using {} as a domain name", domain);
    }

    let parsed: reqwest::Url = url.parse().context("Invalid webhook URL")?;
    bot.set_webhook(parsed)
        .drop_pending_updates(true)
        .await
        .context("Failed to register webhook")?;
    info!("Webhook registered at {}", redact(url, &config.token));

    let info = bot
        .get_webhook_info()
        .await
        .context("Failed to get webhook info")?;
    if let Some(message) = info.last_error_message {
        warn!("Telegram callback failed: {}", message);
    }

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind webhook listener to {addr}"))?;
    info!("Listening on port {}", config.port);

    let (tx, source) = EventSource::channel(TransportMode::Webhook);
    let app = webhook_router(config.webhook_path(), tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Webhook server error: {}", e);
        }
    });

    Ok(source)
}

#[derive(Clone)]
struct WebhookState {
    path: String,
    events: mpsc::Sender<InboundEvent>,
}

/// Receiver for Telegram pushes. Only `path` is accepted; anything else is a
/// 404 so the token stays the only way in.
pub fn webhook_router(path: String, events: mpsc::Sender<InboundEvent>) -> Router {
    Router::new()
        .route("/{*path}", post(receive_update))
        .with_state(WebhookState { path, events })
}

async fn receive_update(
    State(state): State<WebhookState>,
    Path(path): Path<String>,
    body: Bytes,
) -> StatusCode {
    if state.path.trim_start_matches('/') != path {
        return StatusCode::NOT_FOUND;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Dropping undecodable webhook payload: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    if state.events.send(convert_update(update)).await.is_err() {
        warn!("Dispatcher gone, rejecting webhook update");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}
