//! HTTP surface
//!
//! Information Hiding:
//! - axum routing and extractor details stay in this module
//! - `GameError` is mapped to a status code and a `{"error": ...}` body here only
//! - Turns run in spawned tasks so a client disconnect cannot cancel a commit

pub mod routes;
pub mod server;

use crate::error::GameError;
use crate::game::TurnOrchestrator;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

pub use routes::router;
pub use server::run;

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError(pub GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &GameError) -> StatusCode {
    match err {
        GameError::Validation(_) => StatusCode::BAD_REQUEST,
        GameError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        GameError::Conflict(_) => StatusCode::CONFLICT,
        GameError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        GameError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GameError::Configuration(_) | GameError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("[Api] {} {}", status.as_u16(), self.0);
        } else {
            tracing::debug!("[Api] {} {}", status.as_u16(), self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&GameError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&GameError::SessionNotFound("s".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&GameError::Conflict("s".into())), StatusCode::CONFLICT);
        assert_eq!(status_for(&GameError::upstream("openai", "boom")), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&GameError::Timeout(5)), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for(&GameError::Configuration("openai".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
