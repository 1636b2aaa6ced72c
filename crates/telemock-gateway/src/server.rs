// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and the HTTP server loop.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use telemock_config::model::ServerConfig;
use telemock_core::TelemockError;
use telemock_emulator::Emulator;
use telemock_hub::ws_handler;

use crate::{admin, bot_api};

/// Shared state for every HTTP handler.
pub struct AppState {
    pub emulator: Emulator,
    pub started: Instant,
}

impl AppState {
    pub fn new(emulator: Emulator) -> Arc<Self> {
        Arc::new(Self {
            emulator,
            started: Instant::now(),
        })
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    connections: usize,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connections: state.emulator.hub.connection_count(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

/// Build the full application router.
///
/// `/ws` for clients, `/api/*` for administration, and the Bot API at both
/// `/bot<token>/<method>` and `/bot/<token>/<method>`.
pub fn router(state: Arc<AppState>) -> Router {
    let ws = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state.emulator.ws.clone());

    let bot_api = Router::new()
        .route("/{token_segment}/{method}", any(bot_api::prefixed))
        .route("/bot/{token}/{method}", any(bot_api::separated))
        .with_state(state.clone());

    let core = Router::new()
        .route("/health", get(health))
        .nest("/api", admin::routes())
        .with_state(state);

    core.merge(ws)
        .merge(bot_api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `cancel` fires, then drain in-flight requests.
pub async fn serve(
    config: &ServerConfig,
    app: Router,
    cancel: CancellationToken,
) -> Result<(), TelemockError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TelemockError::Internal(format!("failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "telemock listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| TelemockError::Internal(format!("server error: {e}")))?;

    info!("telemock stopped");
    Ok(())
}
