//! Publish request validation, defaulting, and synthetic message ids.
//!
//! A [`PublishDraft`] is what a caller supplies; [`PublishDraft::resolve`]
//! validates it once and fills in every default, producing the
//! [`Publication`] the orchestrator works from.

use chrono::SecondsFormat;

use crate::error::CoreError;
use crate::medium::{parse_media, Medium};
use crate::types::{new_hex_id, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default sender identity when neither the request nor config supplies one.
pub const DEFAULT_SENDER: &str = "Notifications <notifications@hermes.local>";

/// Id prefix for error notifications.
pub const ERROR_ID_PREFIX: &str = "ERROR-";

/// Id prefix for developer notifications.
pub const NOTICE_ID_PREFIX: &str = "NOTICE-";

/// Id prefix for ad hoc single-channel sends.
pub const DIRECT_ID_PREFIX: &str = "G";

/// Default topic for error notifications.
pub const DEFAULT_ERROR_TOPIC: &str = "error-reporting";

/// Default topic for developer notifications.
pub const DEFAULT_NOTICE_TOPIC: &str = "notify-dev";

/// Default subject for error notifications.
pub const DEFAULT_ERROR_SUBJECT: &str = "Hermes Error";

/// Default subject for developer notifications.
pub const DEFAULT_NOTICE_SUBJECT: &str = "Hermes Notification";

/// Maximum length of a caller-supplied message id.
pub const MAX_ID_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A publish request as supplied by the caller, before defaults.
#[derive(Debug, Clone, Default)]
pub struct PublishDraft {
    pub id: String,
    pub message: String,
    pub topics: Vec<String>,
    pub medium: Option<Vec<String>>,
    pub html_message: Option<String>,
    pub sms_message: Option<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
}

/// A validated publish request with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub id: String,
    pub message: String,
    pub topics: Vec<String>,
    pub media: Vec<Medium>,
    pub html_message: String,
    pub sms_message: String,
    pub subject: String,
    pub sender: String,
}

impl Publication {
    /// Human-readable topic summary stored alongside the log entry.
    pub fn topics_summary(&self) -> String {
        format!("Published to: [{}]", self.topics.join(", "))
    }
}

/// Treat empty strings the same as an absent field.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl PublishDraft {
    /// Validate required fields and apply defaults.
    ///
    /// - `medium` defaults to `["email"]`.
    /// - `html_message` and `sms_message` default to `message`.
    /// - `subject` defaults to empty.
    /// - `from` defaults to `default_sender`.
    pub fn resolve(self, default_sender: &str) -> Result<Publication, CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::Validation("id is required".to_string()));
        }
        if self.id.len() > MAX_ID_LEN {
            return Err(CoreError::Validation(format!(
                "id must not exceed {MAX_ID_LEN} characters"
            )));
        }
        if self.message.is_empty() {
            return Err(CoreError::Validation("message is required".to_string()));
        }

        let topics: Vec<String> = self
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            return Err(CoreError::Validation(
                "at least one topic is required".to_string(),
            ));
        }

        let media = match self.medium.filter(|m| !m.is_empty()) {
            Some(names) => parse_media(&names)?,
            None => vec![Medium::Email],
        };

        let html_message = non_empty(self.html_message).unwrap_or_else(|| self.message.clone());
        let sms_message = non_empty(self.sms_message).unwrap_or_else(|| self.message.clone());

        Ok(Publication {
            id: self.id,
            message: self.message,
            topics,
            media,
            html_message,
            sms_message,
            subject: self.subject.unwrap_or_default(),
            sender: non_empty(self.from).unwrap_or_else(|| default_sender.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Privileged notices
// ---------------------------------------------------------------------------

/// Which privileged caller a [`Notice`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// System error report. Defaults to `[email, slack]`.
    Error,
    /// Developer notification. Defaults to `[slack]`.
    Developer,
}

impl NoticeKind {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            NoticeKind::Error => ERROR_ID_PREFIX,
            NoticeKind::Developer => NOTICE_ID_PREFIX,
        }
    }

    pub fn default_media(&self) -> Vec<Medium> {
        match self {
            NoticeKind::Error => vec![Medium::Email, Medium::Slack],
            NoticeKind::Developer => vec![Medium::Slack],
        }
    }
}

/// A message for developers that bypasses the rate limiter.
#[derive(Debug, Clone, Default)]
pub struct Notice {
    pub message: String,
    pub subject: Option<String>,
    pub medium: Option<Vec<String>>,
    pub html_message: Option<String>,
    pub sms_message: Option<String>,
}

/// Topic and subject a notice kind is published with.
#[derive(Debug, Clone)]
pub struct NoticeRoute {
    pub topic: String,
    pub default_subject: String,
}

impl Notice {
    /// Build the publication for this notice, stamping a synthetic id.
    pub fn into_publication(
        self,
        kind: NoticeKind,
        route: &NoticeRoute,
        sender: &str,
        now: Timestamp,
    ) -> Result<Publication, CoreError> {
        let media = match self.medium.filter(|m| !m.is_empty()) {
            Some(names) => parse_media(&names)?,
            None => kind.default_media(),
        };
        let draft = PublishDraft {
            id: synthetic_id(kind.id_prefix(), now),
            message: self.message,
            topics: vec![route.topic.clone()],
            medium: Some(media.iter().map(|m| m.as_str().to_string()).collect()),
            html_message: self.html_message,
            sms_message: self.sms_message,
            subject: Some(
                non_empty(self.subject).unwrap_or_else(|| route.default_subject.clone()),
            ),
            from: None,
        };
        draft.resolve(sender)
    }
}

/// `<prefix><RFC 3339 timestamp with microseconds>`, e.g. `ERROR-2026-01-01T00:00:00.000000Z`.
pub fn synthetic_id(prefix: &str, now: Timestamp) -> String {
    format!("{prefix}{}", now.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Id for an ad hoc single-channel send: `G` followed by a hex uuid.
pub fn direct_send_id() -> String {
    format!("{DIRECT_ID_PREFIX}{}", new_hex_id())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
