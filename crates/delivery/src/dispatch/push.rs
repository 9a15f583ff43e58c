//! Push notifications through a GCM-compatible HTTP gateway.
//!
//! Destinations are either a device registration token or a topic of the
//! form `/topics/<name>`. Topic destinations must appear in the configured
//! allow-list. In mock mode no request is made and a canned response is
//! returned.

use async_trait::async_trait;
use hermes_core::medium::Medium;
use serde_json::{json, Value};

use super::{http_client, into_fields, DeliveryError, Dispatcher, Outbound, ProviderResponse};

/// Default gateway endpoint.
const DEFAULT_PUSH_ENDPOINT: &str = "https://gcm-http.googleapis.com/gcm/send";

/// Prefix marking a topic destination.
pub const TOPIC_PREFIX: &str = "/topics/";

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub endpoint: String,
    pub api_key: String,
    pub allowed_topics: Vec<String>,
    pub mock: bool,
}

impl PushConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable             | Required | Default                                    |
    /// |----------------------|----------|--------------------------------------------|
    /// | `GCM_API_KEY`        | yes      | -                                          |
    /// | `GCM_API_URL`        | no       | `https://gcm-http.googleapis.com/gcm/send` |
    /// | `GCM_ALLOWED_TOPICS` | no       | empty (comma-separated)                    |
    /// | `GCM_MOCK`           | no       | `false`                                    |
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GCM_API_KEY").ok()?;
        Some(Self {
            endpoint: std::env::var("GCM_API_URL")
                .unwrap_or_else(|_| DEFAULT_PUSH_ENDPOINT.to_string()),
            api_key,
            allowed_topics: std::env::var("GCM_ALLOWED_TOPICS")
                .map(|v| {
                    v.split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            mock: std::env::var("GCM_MOCK")
                .map(|v| matches!(v.as_str(), "1" | "true" | "True"))
                .unwrap_or(false),
        })
    }

    /// Whether `destination` may be sent to.
    pub fn permits(&self, destination: &str) -> bool {
        !destination.starts_with(TOPIC_PREFIX)
            || self.allowed_topics.iter().any(|t| t == destination)
    }
}

pub struct PushDispatcher {
    client: reqwest::Client,
    config: PushConfig,
}

impl PushDispatcher {
    pub fn new(config: PushConfig) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }
}

#[async_trait]
impl Dispatcher for PushDispatcher {
    fn medium(&self) -> Medium {
        Medium::Push
    }

    async fn send(&self, outbound: &Outbound) -> Result<ProviderResponse, DeliveryError> {
        if !self.config.permits(&outbound.destination) {
            return Err(DeliveryError::Rejected(format!(
                "topic {} is not in the allowed topics",
                outbound.destination
            )));
        }

        if self.config.mock {
            tracing::debug!(to = %outbound.destination, "Push send mocked");
            return Ok(into_fields(json!({
                "message_id": "mock",
                "mock": true,
            })));
        }

        let payload = json!({
            "data": { "message": outbound.body },
            "to": outbound.destination,
        });
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("key={}", self.config.api_key),
            )
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        tracing::info!(to = %outbound.destination, "Push notification sent");
        Ok(into_fields(body))
    }
}
