//! Handlers for the subscriber lifecycle.
//!
//! A subscriber is created unverified unless the request says otherwise.
//! Subscriptions, which power index-join resolution, exist only for
//! verified subscribers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use hermes_core::error::CoreError;
use hermes_db::models::subscriber::{CreateSubscriber, Subscriber};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::ApiKey;
use crate::request::{flexible_bool, one_or_many};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub sms: Option<String>,
    #[serde(default)]
    pub slack: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    #[validate(length(min = 1, message = "at least one topic is required"))]
    pub topics: Vec<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub verified: bool,
}

impl From<SubscribeRequest> for CreateSubscriber {
    fn from(req: SubscribeRequest) -> Self {
        CreateSubscriber {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            country: req.country,
            sms: req.sms,
            slack: req.slack,
            topics: req
                .topics
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            verified: req.verified,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub subscriber_id: String,
}

fn not_found(id: String) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Subscriber",
        id,
    })
}

/// PUT /subscribe
pub async fn subscribe(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(body): Json<SubscribeRequest>,
) -> AppResult<Json<SubscribeResponse>> {
    body.validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let subscriber = Subscriber::new(body.into());
    state.directory.put(&subscriber).await?;
    if subscriber.verified {
        state
            .directory
            .create_subscriptions(&subscriber.id, &subscriber.topics)
            .await?;
    }

    tracing::info!(
        subscriber_id = %subscriber.id,
        topics = ?subscriber.topics,
        verified = subscriber.verified,
        "Subscriber created"
    );
    Ok(Json(SubscribeResponse {
        subscriber_id: subscriber.id,
    }))
}

/// GET /subscribe/{id}
pub async fn get_subscriber(
    _key: ApiKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Subscriber>> {
    let subscriber = state
        .directory
        .get(&id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(subscriber))
}

/// DELETE /subscribe/{id}
pub async fn delete_subscriber(
    _key: ApiKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if !state.directory.delete(&id).await? {
        return Err(not_found(id));
    }
    tracing::info!(subscriber_id = %id, "Subscriber deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /unsubscribe/{id}
///
/// Target of the unsubscribe link in outgoing messages, so it takes no key.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    if !state.directory.delete(&id).await? {
        return Err(not_found(id));
    }
    tracing::info!(subscriber_id = %id, "Subscriber unsubscribed");
    Ok(Html(
        "<!DOCTYPE html>\n<html><head><title>Unsubscribed</title></head>\
         <body><h1>You have been unsubscribed.</h1>\
         <p>You will no longer receive these notifications.</p></body></html>"
            .to_string(),
    ))
}

/// PUT /verify/{id}
pub async fn verify(
    _key: ApiKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Subscriber>> {
    let subscriber = state
        .directory
        .verify(&id)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(subscriber_id = %subscriber.id, "Subscriber verified");
    Ok(Json(subscriber))
}
