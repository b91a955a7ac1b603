//! HTTP trigger server.
//!
//! `GET /` with the shared-secret header schedules a check and answers at once.
//! Runs only when `--ip` and `--port` are configured.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::core::config::TriggerConfig;
use crate::core::error::AppResult;
use crate::watcher::{Orchestrator, RecorderState};

/// Shared state for the trigger server.
#[derive(Clone)]
pub struct TriggerState {
    orchestrator: Arc<Orchestrator>,
    header: String,
    secret: Arc<SecretString>,
    http_delay: Duration,
}

impl TriggerState {
    pub fn new(orchestrator: Arc<Orchestrator>, config: &TriggerConfig, http_delay: Duration) -> Self {
        Self {
            orchestrator,
            header: config.header.clone(),
            secret: Arc::new(config.secret.clone()),
            http_delay,
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == self.secret.expose_secret())
    }
}

pub fn build_router(state: TriggerState) -> Router {
    Router::new()
        .route("/", get(trigger_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Start the trigger server. Returns after the shutdown token is cancelled.
pub async fn start_trigger_server(config: TriggerConfig, state: TriggerState) -> AppResult<()> {
    let token = state.orchestrator.shutdown_token();
    let app = build_router(state);

    log::info!("Starting trigger server on http://{}", config.addr);
    log::info!("  /        - Trigger a check ({} header)", config.header);
    log::info!("  /status  - Recorder status (JSON)");
    log::info!("  /health  - Health check");

    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    log::info!("Trigger server stopped");
    Ok(())
}

async fn trigger_handler(State(state): State<TriggerState>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        log::debug!("Trigger rejected: missing or wrong {} header", state.header);
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    let orchestrator = Arc::clone(&state.orchestrator);
    let delay = state.http_delay;
    tokio::spawn(async move {
        if orchestrator.state() != RecorderState::Idle {
            log::debug!("Trigger ignored, recorder is {}", orchestrator.state());
            return;
        }
        tokio::time::sleep(delay).await;
        let outcome = orchestrator.check_once().await;
        log::debug!("Triggered check finished: {:?}", outcome);
    });

    (StatusCode::OK, "Ok").into_response()
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn status_handler(State(state): State<TriggerState>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    Json(state.orchestrator.status()).into_response()
}
