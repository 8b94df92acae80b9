//! Statistics endpoint

use std::sync::Arc;

use axum::extract::State;

use super::ApiResponse;
use crate::api::auth::AuthUser;
use crate::api::http::AppState;
use crate::types::Statistics;

/// GET /api/timeline/statistics - Dashboard statistics of the caller
pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResponse<Statistics> {
    ApiResponse::new(state.service.statistics(&user))
}
