//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get, put_json, test_config, ROOT};
use hermes_api::config::ServerConfig;
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = common::build_test_app();
    let response = get(app.router, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
    assert_eq!(json["media"], json!(["email", "sms", "slack"]));
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app();
    let response = get(app.router, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gateway_routes_live_under_root_path() {
    let app = common::build_test_app();
    let response = put_json(
        app.router,
        "/publish",
        json!({"id": "m1", "message": "hi", "topics": ["a"]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app();
    let response = get(app.router, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a valid UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36);
}

// ---------------------------------------------------------------------------
// Test: API key is enforced when configured
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_key_is_required_when_configured() {
    let mut config = test_config();
    config.api_key = Some("secret".to_string());
    let app = common::build_test_app_with(config);
    let uri = format!("{ROOT}/log/m1");

    let response = get(app.router.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Health stays open.
    let response = get(app.router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: CORS headers only for configured origins
// ---------------------------------------------------------------------------

async fn allowed_origin(config: ServerConfig) -> Option<String> {
    let app = common::build_test_app_with(config);
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("access-control-allow-credentials").is_none());
    response
        .headers()
        .get("access-control-allow-origin")
        .map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let origin = allowed_origin(test_config()).await;
    assert_eq!(origin.as_deref(), Some("http://localhost:5173"));
}

#[tokio::test]
async fn cors_is_off_without_origins() {
    let mut config = test_config();
    config.cors_origins.clear();
    assert_eq!(allowed_origin(config).await, None);
}
