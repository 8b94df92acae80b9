//! Step endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::{blocking, ApiError, ApiResponse};
use crate::api::auth::AuthUser;
use crate::api::http::AppState;
use crate::timeline::{LogStepInput, StepInput};
use crate::types::{EventView, StepInfo, WorkflowStep};

/// GET /api/timeline/steps - The fixed step taxonomy
pub async fn list_steps() -> ApiResponse<Vec<StepInfo>> {
    ApiResponse::new(WorkflowStep::ALL.iter().copied().map(StepInfo::from).collect())
}

/// POST /api/timeline/steps - Start a step
pub async fn start_step(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(input): Json<StepInput>,
) -> Result<(StatusCode, ApiResponse<EventView>), ApiError> {
    let service = state.service.clone();
    let event = blocking(move || service.start_step(&user, input)).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(event.into())))
}

/// POST /api/timeline/steps/log - Record an already finished step
pub async fn log_step(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(input): Json<LogStepInput>,
) -> Result<(StatusCode, ApiResponse<EventView>), ApiError> {
    let service = state.service.clone();
    let event = blocking(move || service.log_step(&user, input)).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(event.into())))
}
