use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hermes_core::error::CoreError;
use hermes_db::StoreError;
use hermes_delivery::PublishError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{"message": ..., "code": ...}`
/// bodies. Messages keep the status prefix callers of the gateway match on,
/// e.g. `"400 Bad Request: id m1 already exists"`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "500 Internal Server Error: an internal error occurred";

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

fn classify_core(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("404 Not Found: {entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("400 Bad Request: {msg}"),
        ),
        CoreError::Conflict(msg) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("409 Conflict: {msg}"),
        ),
        CoreError::Unauthorized(msg) => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            format!("401 Unauthorized: {msg}"),
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core(core),

            AppError::Publish(publish) => match publish {
                PublishError::RateLimited { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "RATE_LIMITED",
                    "503 Service Unavailable: too many requests to publish in the past hour. \
                     Try again later."
                        .to_string(),
                ),
                PublishError::DuplicateId(id) => (
                    StatusCode::BAD_REQUEST,
                    "DUPLICATE_ID",
                    format!("400 Bad Request: id {id} already exists"),
                ),
                PublishError::Invalid(core) => classify_core(core),
                PublishError::Store(err) => {
                    tracing::error!(error = %err, "Store error during publish");
                    internal()
                }
                PublishError::LogWrite { id, source } => {
                    tracing::error!(id = %id, error = %source, "Message log write failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "LOG_WRITE_FAILED",
                        format!("500 Internal Server Error: message {id} could not be logged"),
                    )
                }
            },

            AppError::Store(err) => {
                tracing::error!(error = %err, "Store error");
                internal()
            }

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                format!("400 Bad Request: {msg}"),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "message": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
