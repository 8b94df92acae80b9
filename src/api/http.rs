//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::JwtAuth;
use super::rest::{events, sessions, statistics, steps, ApiError, ApiResponse};
use crate::event_store::EventStoreStats;
use crate::timeline::TimelineService;

/// Shared state of all handlers
pub struct AppState {
    pub service: Arc<TimelineService>,
    pub auth: Arc<JwtAuth>,
}

impl AppState {
    pub fn new(service: Arc<TimelineService>, auth: Arc<JwtAuth>) -> Self {
        Self { service, auth }
    }
}

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/health/store", get(store_health))
        // Timeline API
        .route(
            "/api/timeline/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route("/api/timeline/sessions/:id", get(sessions::get_timeline))
        .route(
            "/api/timeline/sessions/:id/revert",
            post(sessions::revert_session),
        )
        .route(
            "/api/timeline/steps",
            get(steps::list_steps).post(steps::start_step),
        )
        .route("/api/timeline/steps/log", post(steps::log_step))
        .route("/api/timeline/events/:id", get(events::get_event))
        .route(
            "/api/timeline/events/:id/complete",
            post(events::complete_event),
        )
        .route("/api/timeline/statistics", get(statistics::get_statistics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Storage figures of the event store
async fn store_health(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<EventStoreStats>, ApiError> {
    Ok(ApiResponse::new(state.service.store_stats()?))
}
