//! Handlers for error and developer notices.
//!
//! Notices bypass the publish rate limiter and are published under a
//! synthetic `ERROR-`/`NOTICE-` id to the configured notice topics.

use axum::extract::{Query, State};
use axum::Json;
use hermes_core::medium::Medium;
use hermes_core::publish::{Notice, NoticeKind};
use hermes_delivery::PublishEntry;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::ApiKey;
use crate::request::opt_one_or_many;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NoticeRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    pub medium: Option<Vec<String>>,
    #[serde(default, rename = "html-message", alias = "html_message")]
    pub html_message: Option<String>,
    #[serde(default, rename = "sms-message", alias = "sms_message")]
    pub sms_message: Option<String>,
}

impl From<NoticeRequest> for Notice {
    fn from(req: NoticeRequest) -> Self {
        Notice {
            message: req.message,
            subject: req.subject,
            medium: req.medium,
            html_message: req.html_message,
            sms_message: req.sms_message,
        }
    }
}

/// Query parameters for `GET /notify`.
#[derive(Debug, Deserialize)]
pub struct NotifyQuery {
    #[serde(default)]
    pub message: String,
    pub subject: Option<String>,
}

/// PUT /error
pub async fn report_error(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(body): Json<NoticeRequest>,
) -> AppResult<Json<Vec<PublishEntry>>> {
    let entries = state.publisher.notify(NoticeKind::Error, body.into()).await?;
    Ok(Json(entries))
}

/// PUT /notify
pub async fn notify_developers(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(body): Json<NoticeRequest>,
) -> AppResult<Json<Vec<PublishEntry>>> {
    let entries = state
        .publisher
        .notify(NoticeKind::Developer, body.into())
        .await?;
    Ok(Json(entries))
}

/// GET /notify?message=..&subject=..
///
/// Chat-only shortcut for scripts that can only issue GET requests.
pub async fn notify_developers_query(
    _key: ApiKey,
    State(state): State<AppState>,
    Query(params): Query<NotifyQuery>,
) -> AppResult<Json<Vec<PublishEntry>>> {
    let notice = Notice {
        message: params.message,
        subject: params.subject,
        medium: Some(vec![Medium::Slack.as_str().to_string()]),
        ..Default::default()
    };
    let entries = state.publisher.notify(NoticeKind::Developer, notice).await?;
    Ok(Json(entries))
}
