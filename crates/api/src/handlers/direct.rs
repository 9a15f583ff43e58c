//! Handlers for ad hoc single-channel sends.
//!
//! These skip topic resolution and the rate limiter. Each send is logged
//! under a generated `G…` id returned as `log_id`.

use axum::extract::State;
use axum::Json;
use hermes_core::error::CoreError;
use hermes_core::medium::Medium;
use hermes_delivery::{DirectMessage, DirectSend};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::ApiKey;
use crate::request::{one_or_many, opt_one_or_many};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[serde(default)]
    pub subject: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    pub email: Option<Vec<String>>,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    pub subscriber_id: Option<Vec<String>>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SmsRequest {
    #[serde(deserialize_with = "one_or_many")]
    #[validate(length(min = 1, message = "at least one number is required"))]
    pub sms: Vec<String>,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GcmRequest {
    #[serde(deserialize_with = "one_or_many")]
    #[validate(length(min = 1, message = "at least one destination is required"))]
    pub destination: Vec<String>,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}

fn validate(body: &impl Validate) -> AppResult<()> {
    body.validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// PUT /email
///
/// Destinations come from `email`, or from the stored addresses of the
/// subscribers listed in `subscriber_id`.
pub async fn send_email(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> AppResult<Json<DirectSend>> {
    validate(&body)?;

    let destinations = match (body.email, body.subscriber_id) {
        (Some(emails), _) if !emails.is_empty() => emails,
        (_, Some(ids)) if !ids.is_empty() => subscriber_emails(&state, &ids).await?,
        _ => {
            return Err(AppError::BadRequest(
                "either email or subscriber_id is required".into(),
            ))
        }
    };

    let message = DirectMessage {
        subject: body.subject,
        body: body.message,
        html: body.html,
        sender: body.from,
    };
    let sent = state
        .publisher
        .send_direct(Medium::Email, &destinations, message)
        .await?;
    Ok(Json(sent))
}

/// Look up the email address of every listed subscriber.
async fn subscriber_emails(state: &AppState, ids: &[String]) -> AppResult<Vec<String>> {
    let found = state.directory.get_many(ids).await?;
    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|s| &s.id == *id)) {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Subscriber",
            id: missing.clone(),
        }));
    }
    Ok(found.into_iter().map(|s| s.email).collect())
}

/// PUT /sms
pub async fn send_sms(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(body): Json<SmsRequest>,
) -> AppResult<Json<DirectSend>> {
    validate(&body)?;

    let message = DirectMessage {
        body: body.message,
        ..Default::default()
    };
    let sent = state
        .publisher
        .send_direct(Medium::Sms, &body.sms, message)
        .await?;
    Ok(Json(sent))
}

/// PUT /gcm
pub async fn send_push(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(body): Json<GcmRequest>,
) -> AppResult<Json<DirectSend>> {
    validate(&body)?;

    let message = DirectMessage {
        body: body.message,
        ..Default::default()
    };
    let sent = state
        .publisher
        .send_direct(Medium::Push, &body.destination, message)
        .await?;
    Ok(Json(sent))
}
