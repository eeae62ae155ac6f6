//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::DispatcherStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: StoreHealthResponse,
    pub mailer: MailerHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct StoreHealthResponse {
    pub backend: String,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct MailerHealthResponse {
    pub backend: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub dispatcher: DispatcherStatsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_available = state.store.ping().await.is_ok();
    let uptime_seconds = state.start_time.elapsed().as_secs();

    let status = if store_available { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        store: StoreHealthResponse {
            backend: state.store.backend_name().to_string(),
            available: store_available,
        },
        mailer: MailerHealthResponse {
            backend: state.mailer.backend_name().to_string(),
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        dispatcher: state.dispatcher.stats(),
    })
}
