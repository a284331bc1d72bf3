//! Error-to-response mapping for API handlers

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use listenlab_common::Error;
use serde_json::json;
use tracing::error;

/// Wrapper turning core errors into HTTP responses.
///
/// Store failures are reported retryable: nothing was partially committed,
/// so the participant can resubmit the same step.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retryable) = match &self.0 {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, false),
            Error::UnknownParticipant(_) | Error::NotFound(_) => (StatusCode::NOT_FOUND, false),
            Error::Store(_) | Error::Database(_) => (StatusCode::SERVICE_UNAVAILABLE, true),
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, false)
            }
        };

        if status.is_server_error() {
            error!("API error: {}", self.0);
        }

        let body = Json(json!({
            "error": self.0.to_string(),
            "retryable": retryable,
        }));
        (status, body).into_response()
    }
}
