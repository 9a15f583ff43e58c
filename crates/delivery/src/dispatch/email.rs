//! Email delivery via SMTP.
//!
//! [`EmailDispatcher`] wraps the `lettre` async SMTP transport and sends a
//! `multipart/alternative` message with plain-text and HTML parts.
//! Configuration is loaded from environment variables; if `SMTP_HOST` is not
//! set, [`EmailConfig::from_env`] returns `None` and email is not registered.

use async_trait::async_trait;
use hermes_core::medium::Medium;
use hermes_core::types::new_hex_id;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::{Map, Value};

use super::{DeliveryError, Dispatcher, Outbound, ProviderResponse};

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Domain used in generated `Message-ID` headers.
const MESSAGE_ID_DOMAIN: &str = "hermes.local";

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Configuration for the SMTP transport.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default |
    /// |-----------------|----------|---------|
    /// | `SMTP_HOST`     | yes      | -       |
    /// | `SMTP_PORT`     | no       | `587`   |
    /// | `SMTP_USER`     | no       | -       |
    /// | `SMTP_PASSWORD` | no       | -       |
    ///
    /// The sender address comes from each message, not from this config.
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDispatcher
// ---------------------------------------------------------------------------

/// Fill in the HTML part from the plain body when none was supplied.
pub fn html_alternative(body: &str, html: Option<&str>) -> String {
    match html {
        Some(html) if !html.trim().is_empty() => html.to_string(),
        _ => body.replace('\n', "<br />"),
    }
}

/// Assemble the MIME message for one recipient.
pub fn build_message(outbound: &Outbound, message_id: &str) -> Result<Message, DeliveryError> {
    let from: Mailbox = outbound.sender.parse()?;
    let to: Mailbox = outbound.destination.parse()?;
    let html = html_alternative(&outbound.body, outbound.html.as_deref());

    Message::builder()
        .from(from)
        .to(to)
        .subject(outbound.subject.clone())
        .message_id(Some(message_id.to_string()))
        .multipart(MultiPart::alternative_plain_html(outbound.body.clone(), html))
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

/// Sends email through a pooled SMTP connection.
pub struct EmailDispatcher {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDispatcher {
    pub fn new(config: EmailConfig) -> Result<Self, DeliveryError> {
        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            transport_builder = transport_builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            mailer: transport_builder.build(),
        })
    }
}

#[async_trait]
impl Dispatcher for EmailDispatcher {
    fn medium(&self) -> Medium {
        Medium::Email
    }

    async fn send(&self, outbound: &Outbound) -> Result<ProviderResponse, DeliveryError> {
        let message_id = format!("<{}@{MESSAGE_ID_DOMAIN}>", new_hex_id());
        let email = build_message(outbound, &message_id)?;
        let response = self.mailer.send(email).await?;

        tracing::info!(to = %outbound.destination, message_id = %message_id, "Email sent");

        let mut fields = Map::new();
        fields.insert("message_id".to_string(), Value::String(message_id));
        fields.insert(
            "smtp_code".to_string(),
            Value::String(response.code().to_string()),
        );
        Ok(fields)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
