#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use hermes_api::config::{GatewayConfig, ServerConfig, StoreBackend};
use hermes_api::router::build_app_router;
use hermes_api::state::AppState;
use hermes_core::medium::Medium;
use hermes_db::memory::{MemoryMessageLog, MemorySubscriberDirectory};
use hermes_delivery::dispatch::ProviderResponse;
use hermes_delivery::{DeliveryError, Dispatcher, DispatcherRegistry, Outbound};

pub const ROOT: &str = "/hermes";

/// Build a test `ServerConfig` backed by the in-memory stores.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        root_path: ROOT.to_string(),
        api_key: None,
        store_backend: StoreBackend::Memory,
        database_url: None,
        gateway: GatewayConfig::default(),
    }
}

// ---------------------------------------------------------------------------
// Fake dispatcher
// ---------------------------------------------------------------------------

/// Records every destination instead of calling a provider.
pub struct FakeDispatcher {
    medium: Medium,
    sent: Mutex<Vec<Outbound>>,
}

impl FakeDispatcher {
    pub fn new(medium: Medium) -> Self {
        Self {
            medium,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub async fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    fn medium(&self) -> Medium {
        self.medium
    }

    async fn send(&self, outbound: &Outbound) -> Result<ProviderResponse, DeliveryError> {
        self.sent.lock().await.push(outbound.clone());
        let mut fields = Map::new();
        fields.insert("message_id".to_string(), json!("fake-1"));
        Ok(fields)
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub directory: Arc<MemorySubscriberDirectory>,
    pub log: Arc<MemoryMessageLog>,
    pub email: Arc<FakeDispatcher>,
    pub sms: Arc<FakeDispatcher>,
    pub slack: Arc<FakeDispatcher>,
}

/// Build the full application router with fake email, SMS and chat dispatchers.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let directory = Arc::new(MemorySubscriberDirectory::new());
    let log = Arc::new(MemoryMessageLog::default());
    let email = Arc::new(FakeDispatcher::new(Medium::Email));
    let sms = Arc::new(FakeDispatcher::new(Medium::Sms));
    let slack = Arc::new(FakeDispatcher::new(Medium::Slack));

    let dispatchers = DispatcherRegistry::new()
        .with(email.clone())
        .with(sms.clone())
        .with(slack.clone());

    let state = AppState::new(config.clone(), directory.clone(), log.clone(), dispatchers);

    TestApp {
        router: build_app_router(state, &config),
        directory,
        log,
        email,
        sms,
        slack,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Create a subscriber through the API and return its id.
pub async fn subscribe(app: &TestApp, first_name: &str, topics: &[&str], verified: bool) -> String {
    let response = put_json(
        app.router.clone(),
        &format!("{ROOT}/subscribe"),
        json!({
            "first_name": first_name,
            "last_name": "Tester",
            "email": format!("{}@example.org", first_name.to_lowercase()),
            "country": "demo",
            "topics": topics,
            "verified": verified,
        }),
    )
    .await;
    assert_eq!(response.status(), 200);
    body_json(response).await["subscriber_id"]
        .as_str()
        .unwrap()
        .to_string()
}
