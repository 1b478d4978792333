//! Mapping of engine failures onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use promise_core::{EngineError, InvalidCompletionState};

/// Error body returned by every route.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// A failed request, ready to be rendered.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

/// Status for an engine error. Applied uniformly across routes.
pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::PromiseNotFound(_)
        | EngineError::ScheduleNotFound(_)
        | EngineError::TaskNotFound(_) => StatusCode::NOT_FOUND,

        EngineError::PromiseAlreadyExists(_)
        | EngineError::ScheduleAlreadyExists(_)
        | EngineError::TaskAlreadyClaimed(_)
        | EngineError::TaskAlreadyCompleted(_)
        | EngineError::TaskInvalidCounter { .. }
        | EngineError::TaskInvalidState(_) => StatusCode::CONFLICT,

        EngineError::PromiseAlreadyResolved(_)
        | EngineError::PromiseAlreadyRejected(_)
        | EngineError::PromiseAlreadyCanceled(_)
        | EngineError::PromiseAlreadyTimedout(_) => StatusCode::FORBIDDEN,

        EngineError::Invalid(_) => StatusCode::BAD_REQUEST,
        EngineError::Stopped => StatusCode::SERVICE_UNAVAILABLE,

        EngineError::Abandoned(_)
        | EngineError::UnexpectedResponse { .. }
        | EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self {
            status: status_for(&err),
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<InvalidCompletionState> for ApiError {
    fn from(err: InvalidCompletionState) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_state",
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, code = self.code, error = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}
