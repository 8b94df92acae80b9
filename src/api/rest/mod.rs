//! REST API module for the timeline
//!
//! - `POST /api/timeline/sessions` - Create a session id
//! - `GET /api/timeline/sessions` - List sessions with pagination
//! - `GET /api/timeline/sessions/:id` - Session timeline
//! - `POST /api/timeline/sessions/:id/revert` - Revert to an event
//! - `GET|POST /api/timeline/steps` - Step taxonomy / start a step
//! - `POST /api/timeline/steps/log` - Log a finished step
//! - `GET /api/timeline/events/:id` - Get single event
//! - `POST /api/timeline/events/:id/complete` - Complete a step
//! - `GET /api/timeline/statistics` - Dashboard statistics

pub mod events;
pub mod sessions;
pub mod statistics;
pub mod steps;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthError;
use crate::error::{TimelineError, TimelineResult};
use crate::timeline::MAX_SESSION_PAGE;

/// Common pagination parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    /// Maximum number of items to return (default: 100, max: 1000)
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Number of items to skip
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    100
}

impl PaginationParams {
    /// Normalize limit to max 1000
    pub fn normalized_limit(&self) -> usize {
        self.limit.min(MAX_SESSION_PAGE)
    }
}

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    /// Total count (for paginated responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data, total: None }
    }

    pub fn with_total(data: T, total: usize) -> Self {
        Self {
            data,
            total: Some(total),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: message.into(),
            code: code.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<TimelineError> for ApiError {
    fn from(err: TimelineError) -> Self {
        let status = match &err {
            TimelineError::EventNotFound(_) | TimelineError::SessionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            TimelineError::Forbidden(_) => StatusCode::FORBIDDEN,
            TimelineError::InvalidStep(_) | TimelineError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            TimelineError::InvalidRevertTarget { .. } | TimelineError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            TimelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if !err.is_client_error() {
            tracing::error!(error = %err, "timeline request failed");
        }

        Self::new(status, err.code(), err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Run a blocking service call off the async executor
///
/// Service writes fsync the log, so they never run on a runtime worker.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> TimelineResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}
