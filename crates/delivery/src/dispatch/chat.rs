//! Chat delivery through a Slack-compatible incoming webhook.

use async_trait::async_trait;
use hermes_core::medium::Medium;
use serde_json::{json, Map, Value};

use super::{http_client, DeliveryError, Dispatcher, Outbound, ProviderResponse};

/// Default bot name shown next to posted messages.
const DEFAULT_CHAT_USERNAME: &str = "Hermes";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub webhook_url: String,
    pub username: String,
}

impl ChatConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable            | Required | Default  |
    /// |---------------------|----------|----------|
    /// | `SLACK_WEBHOOK_URL` | yes      | -        |
    /// | `SLACK_USERNAME`    | no       | `Hermes` |
    pub fn from_env() -> Option<Self> {
        let webhook_url = std::env::var("SLACK_WEBHOOK_URL").ok()?;
        Some(Self {
            webhook_url,
            username: std::env::var("SLACK_USERNAME")
                .unwrap_or_else(|_| DEFAULT_CHAT_USERNAME.to_string()),
        })
    }
}

/// Post text: the subject in bold italics, a pipe, then the message.
pub fn chat_text(subject: &str, message: &str) -> String {
    if subject.is_empty() {
        message.to_string()
    } else {
        format!("*_{subject}_* | {message}")
    }
}

/// Posts messages to a channel or user through the webhook.
pub struct ChatDispatcher {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatDispatcher {
    pub fn new(config: ChatConfig) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    fn payload(&self, outbound: &Outbound) -> Value {
        json!({
            "text": chat_text(&outbound.subject, &outbound.body),
            "channel": outbound.destination,
            "username": self.config.username,
        })
    }
}

#[async_trait]
impl Dispatcher for ChatDispatcher {
    fn medium(&self) -> Medium {
        Medium::Slack
    }

    async fn send(&self, outbound: &Outbound) -> Result<ProviderResponse, DeliveryError> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.payload(outbound))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::HttpStatus(status.as_u16()));
        }

        tracing::info!(channel = %outbound.destination, "Chat message posted");
        let mut fields = Map::new();
        fields.insert("code".to_string(), Value::from(status.as_u16()));
        Ok(fields)
    }
}
