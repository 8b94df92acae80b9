//! Event endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::{blocking, ApiError, ApiResponse};
use crate::api::auth::AuthUser;
use crate::api::http::AppState;
use crate::timeline::CompleteInput;
use crate::types::EventView;

/// GET /api/timeline/events/:id - Get single event
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<ApiResponse<EventView>, ApiError> {
    let event = state.service.get_event(&user, &event_id)?;
    Ok(ApiResponse::new(event.into()))
}

/// POST /api/timeline/events/:id/complete - Complete or fail a step
///
/// The body is optional; an empty body completes the step as is.
pub async fn complete_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    body: Option<Json<CompleteInput>>,
) -> Result<ApiResponse<EventView>, ApiError> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let service = state.service.clone();
    let event = blocking(move || service.complete_step(&user, &event_id, input)).await?;
    Ok(ApiResponse::new(event.into()))
}
