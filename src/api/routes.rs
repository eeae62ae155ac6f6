use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;
use crate::triggers::{listing_updated, message_created, weekly_digest};

use super::health::{health, stats};
use super::metrics::prometheus_metrics;

/// Routes that must stay reachable without credentials.
pub fn observability_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
}

/// Mutating trigger endpoints, mounted behind API key auth.
pub fn trigger_routes() -> Router<AppState> {
    Router::new().nest(
        "/api",
        Router::new()
            // Event triggers
            .route("/triggers/message-created", post(message_created))
            .route("/triggers/listing-updated", post(listing_updated))
            // Scheduled jobs, callable by an external scheduler
            .route("/jobs/weekly-digest", post(weekly_digest)),
    )
}
