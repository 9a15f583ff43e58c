//! SMS delivery through a Nexmo-compatible HTTP API.

use async_trait::async_trait;
use hermes_core::medium::Medium;
use serde_json::Value;

use super::{http_client, into_fields, DeliveryError, Dispatcher, Outbound, ProviderResponse};

/// Default provider endpoint.
const DEFAULT_SMS_ENDPOINT: &str = "https://rest.nexmo.com/sms/json";

/// Default sender name shown on the handset.
const DEFAULT_SMS_FROM: &str = "Hermes";

/// Configuration for the SMS provider.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_secret: String,
    pub from: String,
}

impl SmsConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable            | Required | Default                           |
    /// |---------------------|----------|-----------------------------------|
    /// | `NEXMO_API_KEY`     | yes      | -                                 |
    /// | `NEXMO_API_SECRET`  | yes      | -                                 |
    /// | `SMS_ENDPOINT`      | no       | `https://rest.nexmo.com/sms/json` |
    /// | `SMS_FROM`          | no       | `Hermes`                          |
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("NEXMO_API_KEY").ok()?;
        let api_secret = std::env::var("NEXMO_API_SECRET").ok()?;
        Some(Self {
            endpoint: std::env::var("SMS_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_SMS_ENDPOINT.to_string()),
            api_key,
            api_secret,
            from: std::env::var("SMS_FROM").unwrap_or_else(|_| DEFAULT_SMS_FROM.to_string()),
        })
    }
}

/// Find the first per-message failure in a provider response.
///
/// The provider reports `status: "0"` for every accepted message part.
pub fn rejection_reason(body: &Value) -> Option<String> {
    body.get("messages")?
        .as_array()?
        .iter()
        .find(|m| m.get("status").and_then(Value::as_str) != Some("0"))
        .map(|m| {
            m.get("error-text")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error")
                .to_string()
        })
}

/// Sends SMS messages with one GET request per message.
pub struct SmsDispatcher {
    client: reqwest::Client,
    config: SmsConfig,
}

impl SmsDispatcher {
    pub fn new(config: SmsConfig) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }
}

#[async_trait]
impl Dispatcher for SmsDispatcher {
    fn medium(&self) -> Medium {
        Medium::Sms
    }

    async fn send(&self, outbound: &Outbound) -> Result<ProviderResponse, DeliveryError> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("api_secret", self.config.api_secret.as_str()),
                ("to", outbound.destination.as_str()),
                ("from", self.config.from.as_str()),
                ("text", outbound.body.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        if let Some(reason) = rejection_reason(&body) {
            return Err(DeliveryError::Rejected(reason));
        }

        tracing::info!(to = %outbound.destination, "SMS sent");
        Ok(into_fields(body))
    }
}
