//! Session endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{blocking, ApiError, ApiResponse, PaginationParams};
use crate::api::auth::AuthUser;
use crate::api::http::AppState;
use crate::types::{EventView, RevertResponse};

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Query parameters for a session timeline
#[derive(Debug, Deserialize)]
pub struct TimelineParams {
    #[serde(rename = "includeUndone", default = "default_include_undone")]
    pub include_undone: bool,
}

fn default_include_undone() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RevertRequest {
    #[serde(rename = "eventId")]
    pub event_id: String,
}

/// POST /api/timeline/sessions - Allocate a session id
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> impl IntoResponse {
    let session_id = state.service.create_session(&user);
    (
        StatusCode::CREATED,
        ApiResponse::new(CreatedSession { session_id }),
    )
}

/// GET /api/timeline/sessions - List sessions, most recent first
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let total = state.service.session_count(&user);
    let sessions =
        state
            .service
            .list_sessions(&user, params.normalized_limit(), params.offset);
    ApiResponse::with_total(sessions, total)
}

/// GET /api/timeline/sessions/:id - Events of one session in timeline order
pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
    Query(params): Query<TimelineParams>,
) -> Result<ApiResponse<Vec<EventView>>, ApiError> {
    let events = state
        .service
        .get_session_timeline(&user, &session_id, params.include_undone)?;
    let total = events.len();
    Ok(ApiResponse::with_total(
        events.into_iter().map(EventView::from).collect(),
        total,
    ))
}

/// POST /api/timeline/sessions/:id/revert - Roll back to an event
pub async fn revert_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
    Json(body): Json<RevertRequest>,
) -> Result<ApiResponse<RevertResponse>, ApiError> {
    let service = state.service.clone();
    let session = session_id.clone();
    let result = blocking(move || service.revert_to_event(&user, &session, &body.event_id)).await?;

    if result.is_partial() {
        tracing::warn!(
            session = %session_id,
            warnings = result.cascade_warnings.len(),
            "revert committed but some transformation records are stale"
        );
    }
    Ok(ApiResponse::new(RevertResponse::from(result)))
}
