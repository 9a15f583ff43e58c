//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values.

use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use hermes_api::error::AppError;
use hermes_core::error::CoreError;
use hermes_db::StoreError;
use hermes_delivery::PublishError;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rate_limited_returns_503() {
    let (status, json) =
        error_to_response(AppError::Publish(PublishError::RateLimited { attempts: 41 })).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "RATE_LIMITED");
    assert_eq!(
        json["message"],
        "503 Service Unavailable: too many requests to publish in the past hour. Try again later."
    );
}

#[tokio::test]
async fn duplicate_id_returns_400() {
    let (status, json) =
        error_to_response(AppError::Publish(PublishError::DuplicateId("m1".into()))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "400 Bad Request: id m1 already exists");
}

#[tokio::test]
async fn invalid_publish_returns_400() {
    let err: AppError = PublishError::from(CoreError::Validation("message is required".into())).into();
    assert_matches!(err, AppError::Publish(PublishError::Invalid(_)));

    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["message"], "400 Bad Request: message is required");
}

#[tokio::test]
async fn log_write_failure_returns_500_without_store_detail() {
    let err = AppError::Publish(PublishError::LogWrite {
        id: "m1".into(),
        source: StoreError::PayloadTooLarge("row is 9000000 bytes".into()),
    });

    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "LOG_WRITE_FAILED");
    assert!(!json["message"].as_str().unwrap().contains("9000000"));
}

// ---------------------------------------------------------------------------
// Core and HTTP errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Subscriber",
        id: "abc".into(),
    });

    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["message"], "404 Not Found: Subscriber with id abc not found");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let (status, json) = error_to_response(AppError::BadRequest("invalid field value".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["message"], "400 Bad Request: invalid field value");
}

#[tokio::test]
async fn internal_error_is_sanitised() {
    let (status, json) =
        error_to_response(AppError::InternalError("secret connection string".into())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(!json["message"].as_str().unwrap().contains("secret"));
}
