use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::platform::Platform;
use crate::transport::TransportMode;

pub const POLLING_BODY: &str = "Can't check health from this end, webhooks are disabled\n";

/// What the liveness check inspects
#[derive(Clone)]
pub enum HealthCheck {
    /// Webhook registration is looked up on every check
    Webhook(Arc<dyn Platform>),
    /// Nothing server-side to inspect
    Polling,
}

impl HealthCheck {
    pub fn new(mode: TransportMode, platform: Arc<dyn Platform>) -> Self {
        match mode {
            TransportMode::Webhook => HealthCheck::Webhook(platform),
            TransportMode::Polling => HealthCheck::Polling,
        }
    }

    pub async fn status(&self) -> (StatusCode, String) {
        let platform = match self {
            HealthCheck::Polling => return (StatusCode::OK, POLLING_BODY.to_string()),
            HealthCheck::Webhook(platform) => platform,
        };

        let status = match platform.webhook_info().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Health check could not get webhook info: {:#}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Can't get webhook info\n".to_string(),
                );
            }
        };

        if !status.is_set() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Webhook is not set\n".to_string(),
            );
        }

        if status.pending_update_count > 0 {
            let body = status.last_error_message.unwrap_or_default();
            return (StatusCode::SERVICE_UNAVAILABLE, format!("{body}\n"));
        }

        (StatusCode::OK, "OK\n".to_string())
    }
}

pub fn router(check: HealthCheck) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(check)
}

async fn health(State(check): State<HealthCheck>) -> (StatusCode, String) {
    check.status().await
}

/// Serve `/health` on `addr` in the background. A failure to bind is logged;
/// the bot keeps relaying without a health endpoint.
pub fn spawn(addr: &str, check: HealthCheck) {
    let addr = addr.to_string();
    tokio::spawn(async move {
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind health endpoint to {}: {}", addr, e);
                return;
            }
        };
        info!("Health endpoint listening on http://{}/health", addr);

        if let Err(e) = axum::serve(listener, router(check)).await {
            error!("Health endpoint error: {}", e);
        }
    });
}
