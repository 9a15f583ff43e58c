//! Channel dispatchers.
//!
//! Each medium is served by one [`Dispatcher`] implementation. The publish
//! path looks dispatchers up in a [`DispatcherRegistry`] keyed by
//! [`Medium`], so adding a channel means registering another implementation.
//!
//! - [`email`] sends multipart mail over SMTP.
//! - [`sms`] calls a Nexmo-compatible HTTP API.
//! - [`chat`] posts to a Slack-compatible incoming webhook.
//! - [`push`] posts to a GCM-compatible push gateway.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hermes_core::medium::Medium;
use hermes_db::models::subscriber::Subscriber;
use serde_json::{Map, Value};

pub mod chat;
pub mod email;
pub mod push;
pub mod sms;

/// Request timeout used by the HTTP-based transports.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider-specific result fields returned by a successful send.
pub type ProviderResponse = Map<String, Value>;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a single failed send.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider returned HTTP {0}")]
    HttpStatus(u16),

    /// The provider accepted the request but refused the message.
    #[error("Provider rejected message: {0}")]
    Rejected(String),

    /// The send did not finish within the dispatch timeout.
    #[error("Send timed out after {0:?}")]
    Timeout(Duration),
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// One rendered message bound for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub destination: String,
    pub subject: String,
    /// Body for the medium: the SMS body for SMS, the plain body otherwise.
    pub body: String,
    /// HTML alternative, used by email only.
    pub html: Option<String>,
    pub sender: String,
}

/// A transport for one medium.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn medium(&self) -> Medium;

    /// Send one message, returning the provider's response fields.
    async fn send(&self, outbound: &Outbound) -> Result<ProviderResponse, DeliveryError>;
}

/// The subscriber's address for `medium`, if they have one.
///
/// Push has no per-subscriber address; push sends go through the direct API.
pub fn address_for(medium: Medium, subscriber: &Subscriber) -> Option<String> {
    let address = match medium {
        Medium::Email => Some(subscriber.email.as_str()),
        Medium::Sms => subscriber.sms.as_deref(),
        Medium::Slack => subscriber.slack.as_deref(),
        Medium::Push => None,
    };
    address
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Dispatchers by medium.
#[derive(Clone, Default)]
pub struct DispatcherRegistry {
    dispatchers: BTreeMap<Medium, Arc<dyn Dispatcher>>,
}

impl DispatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatcher, replacing any existing one for the same medium.
    pub fn register(&mut self, dispatcher: Arc<dyn Dispatcher>) -> &mut Self {
        self.dispatchers.insert(dispatcher.medium(), dispatcher);
        self
    }

    pub fn with(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.register(dispatcher);
        self
    }

    pub fn get(&self, medium: Medium) -> Option<Arc<dyn Dispatcher>> {
        self.dispatchers.get(&medium).cloned()
    }

    /// Registered media in canonical order.
    pub fn media(&self) -> Vec<Medium> {
        self.dispatchers.keys().copied().collect()
    }

    /// Build a registry from whichever transports are configured in the
    /// environment. Unconfigured transports are logged and left out.
    pub fn from_env() -> Result<Self, DeliveryError> {
        let mut registry = Self::new();

        match email::EmailConfig::from_env() {
            Some(config) => {
                registry.register(Arc::new(email::EmailDispatcher::new(config)?));
            }
            None => tracing::warn!("SMTP_HOST not set, email delivery disabled"),
        }
        match sms::SmsConfig::from_env() {
            Some(config) => {
                registry.register(Arc::new(sms::SmsDispatcher::new(config)?));
            }
            None => tracing::warn!("NEXMO_API_KEY not set, SMS delivery disabled"),
        }
        match chat::ChatConfig::from_env() {
            Some(config) => {
                registry.register(Arc::new(chat::ChatDispatcher::new(config)?));
            }
            None => tracing::warn!("SLACK_WEBHOOK_URL not set, chat delivery disabled"),
        }
        match push::PushConfig::from_env() {
            Some(config) => {
                registry.register(Arc::new(push::PushDispatcher::new(config)?));
            }
            None => tracing::warn!("GCM_API_KEY not set, push delivery disabled"),
        }

        tracing::info!(media = ?registry.media(), "Dispatchers registered");
        Ok(registry)
    }
}

/// Build the shared HTTP client used by the HTTP transports.
pub(crate) fn http_client() -> Result<reqwest::Client, DeliveryError> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Turn a provider JSON body into response fields.
///
/// Non-object bodies are wrapped as `{"response": body}`.
pub(crate) fn into_fields(body: Value) -> ProviderResponse {
    match body {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("response".to_string(), other);
            map
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use hermes_db::models::subscriber::CreateSubscriber;
    use serde_json::json;

    use super::*;

    struct Noop(Medium);

    #[async_trait]
    impl Dispatcher for Noop {
        fn medium(&self) -> Medium {
            self.0
        }

        async fn send(&self, _outbound: &Outbound) -> Result<ProviderResponse, DeliveryError> {
            Ok(Map::new())
        }
    }

    fn subscriber(sms: Option<&str>) -> Subscriber {
        Subscriber::new(CreateSubscriber {
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            email: "ann@example.org".to_string(),
            country: "demo".to_string(),
            sms: sms.map(str::to_string),
            slack: None,
            topics: vec![],
            verified: true,
        })
    }

    #[test]
    fn address_for_reads_the_matching_contact_field() {
        let s = subscriber(Some("+441234"));
        assert_eq!(address_for(Medium::Email, &s).as_deref(), Some("ann@example.org"));
        assert_eq!(address_for(Medium::Sms, &s).as_deref(), Some("+441234"));
        assert_eq!(address_for(Medium::Slack, &s), None);
        assert_eq!(address_for(Medium::Push, &s), None);
    }

    #[test]
    fn blank_contact_field_counts_as_missing() {
        let s = subscriber(Some("  "));
        assert_eq!(address_for(Medium::Sms, &s), None);
    }

    #[test]
    fn registry_replaces_by_medium() {
        let registry = DispatcherRegistry::new()
            .with(Arc::new(Noop(Medium::Slack)))
            .with(Arc::new(Noop(Medium::Email)))
            .with(Arc::new(Noop(Medium::Slack)));
        assert_eq!(registry.media(), vec![Medium::Email, Medium::Slack]);
        assert!(registry.get(Medium::Sms).is_none());
    }

    #[test]
    fn into_fields_wraps_non_objects() {
        assert_eq!(into_fields(json!({"a": 1}))["a"], 1);
        assert_eq!(into_fields(json!("ok"))["response"], "ok");
    }

    #[test]
    fn delivery_error_display_http_status() {
        let err = DeliveryError::HttpStatus(502);
        assert_eq!(err.to_string(), "Provider returned HTTP 502");
    }
}
