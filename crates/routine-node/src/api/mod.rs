//! HTTP handlers.

pub mod compile;
pub mod health;
pub mod runs;
pub mod simulate;
pub mod tools;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use routine_core::RoutineError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Routine(#[from] RoutineError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Routine(err) => match err {
                RoutineError::NothingToCompile { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RoutineError::InvalidPlannerOutput { .. } => StatusCode::BAD_REQUEST,
                RoutineError::PlannerFailed { .. } => StatusCode::BAD_GATEWAY,
                RoutineError::NotFound { .. } => StatusCode::NOT_FOUND,
                RoutineError::SerializationError(_) | RoutineError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("❌ {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Shorthand for a missing run.
pub(crate) fn run_not_found(id: uuid::Uuid) -> ApiError {
    ApiError::Routine(RoutineError::NotFound {
        resource_type: "run".to_string(),
        id: id.to_string(),
    })
}
