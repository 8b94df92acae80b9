//! API module for the HTTP endpoints
//!
//! REST API over the timeline service, guarded by JWT bearer tokens.

pub mod auth;
pub mod http;
pub mod rest;

pub use auth::{AuthError, AuthUser, JwtAuth};
pub use http::{create_router, AppState};
