//! Handler for `PUT /publish`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use hermes_core::error::CoreError;
use hermes_core::publish::PublishDraft;
use hermes_delivery::PublishEntry;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::ApiKey;
use crate::request::{one_or_many, opt_one_or_many};
use crate::state::AppState;

/// Body of a publish request.
///
/// Every field is optional at the decoding stage. Missing fields are
/// reported by draft validation after the rate check.
#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub topics: Vec<String>,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    pub medium: Option<Vec<String>>,
    #[serde(default, rename = "html-message", alias = "html_message")]
    pub html_message: Option<String>,
    #[serde(default, rename = "sms-message", alias = "sms_message")]
    pub sms_message: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

impl From<PublishRequest> for PublishDraft {
    fn from(req: PublishRequest) -> Self {
        PublishDraft {
            id: req.id,
            message: req.message,
            topics: req.topics,
            medium: req.medium,
            html_message: req.html_message,
            sms_message: req.sms_message,
            subject: req.subject,
            from: req.from,
        }
    }
}

/// PUT /publish
///
/// Deliver a message to every verified follower of the given topics.
/// Returns one entry per attempted delivery, plus one per dangling
/// subscription that was cleaned up.
///
/// A body that does not decode still counts as an attempt and is rejected
/// with 400.
pub async fn publish(
    _key: ApiKey,
    State(state): State<AppState>,
    body: Result<Json<PublishRequest>, JsonRejection>,
) -> AppResult<Json<Vec<PublishEntry>>> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            state.publisher.admit().await?;
            return Err(AppError::Core(CoreError::Validation(rejection.body_text())));
        }
    };
    let entries = state.publisher.publish(body.into()).await?;
    Ok(Json(entries))
}
