use axum::{middleware::from_fn_with_state, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::api::{observability_routes, trigger_routes};

use super::middleware::api_key_auth;
use super::AppState;

/// Largest accepted request body; trigger payloads are a few KB at most
const MAX_BODY_BYTES: usize = 256 * 1024;

pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and metrics stay open for probes and scrapers
        .merge(observability_routes())
        // Trigger endpoints sit behind the API key
        .merge(trigger_routes().route_layer(from_fn_with_state(state.clone(), api_key_auth)))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        // Add state
        .with_state(state)
}
