use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    /// An upstream collaborator refused the request; `details` is echoed to the caller.
    #[error("Upstream error: {message}")]
    Upstream { message: String, details: Value },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
            AppError::Upstream { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message, "details": details }),
            ),
        };

        tracing::error!("Error: {}: {}", status, self);

        (status, Json(body)).into_response()
    }
}
