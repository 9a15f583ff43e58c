//! Publish orchestrator.
//!
//! [`Publisher::publish`] runs one publish call through its states in order:
//!
//! 1. **Rate check.** Every attempt is recorded. An exceeded limit sends an
//!    urgent error notice to developers and fails with
//!    [`PublishError::RateLimited`].
//! 2. **Validation.** The draft is validated and defaults are applied once.
//! 3. **Dedup check.** An id already in the log fails with
//!    [`PublishError::DuplicateId`] before any resolution or dispatch.
//! 4. **Resolution.** The full topic set is resolved once, so a subscriber
//!    following several topics receives at most one message per medium.
//! 5. **Dispatch.** One unit per subscriber and medium, subscriber-major and
//!    in the supplied medium order, run concurrently up to the configured
//!    bound. Each unit has its own timeout and failures stay confined to it.
//! 6. **Log.** The outcome is written exactly once, even when nobody matched.
//!
//! Error and developer notices skip step 1 and get a synthetic id.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use hermes_core::error::CoreError;
use hermes_core::medium::Medium;
use hermes_core::merge::merge_keywords;
use hermes_core::publish::{
    direct_send_id, Notice, NoticeKind, NoticeRoute, Publication, PublishDraft, DEFAULT_ERROR_SUBJECT,
    DEFAULT_ERROR_TOPIC, DEFAULT_NOTICE_SUBJECT, DEFAULT_NOTICE_TOPIC, DEFAULT_SENDER,
};
use hermes_core::rate_limit::RateLimiter;
use hermes_db::models::message_log::NewLogEntry;
use hermes_db::models::subscriber::Subscriber;
use hermes_db::StoreError;
use serde::Serialize;

use crate::dispatch::{
    address_for, DeliveryError, Dispatcher, DispatcherRegistry, Outbound, ProviderResponse,
};
use crate::ledger::{Ledger, Recorded};
use crate::resolver::SubscriberResolver;

/// Default number of dispatch units in flight per publish call.
pub const DEFAULT_DISPATCH_CONCURRENCY: usize = 16;

/// Default time allowed for a single provider call.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Subject of the notice sent when the publish rate limit is exceeded.
pub const RATE_LIMIT_SUBJECT: &str = "URGENT ERROR - Message Rate Limit Exceeded";

/// Error recorded for a requested medium that has no registered dispatcher.
pub const MEDIUM_NOT_CONFIGURED: &str = "medium not configured";

/// Keys set by the orchestrator on every delivery result.
const RESERVED_FIELDS: [&str; 5] = ["type", "destination", "message", "success", "error"];

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Too many publish attempts inside the rate window.
    #[error("too many requests to publish in the past hour ({attempts} attempts)")]
    RateLimited { attempts: usize },

    /// A message with this id was already published.
    #[error("id {0} already exists")]
    DuplicateId(String),

    /// The request failed validation.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// The directory or log could not be read.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The log entry could not be written, even truncated.
    #[error("Failed to log message {id}: {source}")]
    LogWrite {
        id: String,
        #[source]
        source: StoreError,
    },
}

// ---------------------------------------------------------------------------
// Response entries
// ---------------------------------------------------------------------------

/// Outcome of one dispatch unit.
///
/// Serialized flat: provider fields sit alongside `type`, `destination`,
/// `message` and `success`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryResult {
    #[serde(rename = "type")]
    pub medium: Medium,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub provider: ProviderResponse,
}

impl DeliveryResult {
    fn unconfigured(medium: Medium) -> Self {
        Self {
            medium,
            destination: None,
            message: None,
            success: false,
            error: Some(MEDIUM_NOT_CONFIGURED.to_string()),
            provider: ProviderResponse::new(),
        }
    }

    fn from_outcome(
        medium: Medium,
        outbound: Outbound,
        outcome: Result<ProviderResponse, DeliveryError>,
    ) -> Self {
        let (success, error, mut provider) = match outcome {
            Ok(fields) => (true, None, fields),
            Err(e) => (false, Some(e.to_string()), ProviderResponse::new()),
        };
        for key in RESERVED_FIELDS {
            provider.remove(key);
        }
        Self {
            medium,
            destination: Some(outbound.destination),
            message: Some(outbound.body),
            success,
            error,
            provider,
        }
    }
}

/// One element of a publish response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PublishEntry {
    Delivery(DeliveryResult),
    /// A subscription referenced a missing subscriber, which has been cleaned up.
    Dangling {
        message: String,
        subscriber_id: String,
    },
}

impl PublishEntry {
    fn dangling(subscriber_id: &str) -> Self {
        PublishEntry::Dangling {
            message: format!(
                "500 Internal Server Error: subscriber id {subscriber_id} doesn't exist. \
                 The subscriber has been deleted properly."
            ),
            subscriber_id: subscriber_id.to_string(),
        }
    }

    pub fn as_delivery(&self) -> Option<&DeliveryResult> {
        match self {
            PublishEntry::Delivery(result) => Some(result),
            PublishEntry::Dangling { .. } => None,
        }
    }
}

/// Result of an ad hoc send through a single medium.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectSend {
    pub log_id: String,
    pub entries: Vec<PublishEntry>,
}

/// Message content for an ad hoc send.
#[derive(Debug, Clone, Default)]
pub struct DirectMessage {
    pub subject: String,
    pub body: String,
    pub html: Option<String>,
    pub sender: Option<String>,
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub default_sender: String,
    pub dispatch_concurrency: usize,
    pub dispatch_timeout: Duration,
    pub error_route: NoticeRoute,
    pub notice_route: NoticeRoute,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            default_sender: DEFAULT_SENDER.to_string(),
            dispatch_concurrency: DEFAULT_DISPATCH_CONCURRENCY,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            error_route: NoticeRoute {
                topic: DEFAULT_ERROR_TOPIC.to_string(),
                default_subject: DEFAULT_ERROR_SUBJECT.to_string(),
            },
            notice_route: NoticeRoute {
                topic: DEFAULT_NOTICE_TOPIC.to_string(),
                default_subject: DEFAULT_NOTICE_SUBJECT.to_string(),
            },
        }
    }
}

enum DispatchUnit {
    Send {
        dispatcher: Arc<dyn Dispatcher>,
        outbound: Outbound,
    },
    Unconfigured(Medium),
}

impl DispatchUnit {
    fn destination(&self) -> Option<&str> {
        match self {
            DispatchUnit::Send { outbound, .. } => Some(outbound.destination.as_str()),
            DispatchUnit::Unconfigured(_) => None,
        }
    }
}

/// Runs publish calls against the limiter, ledger, resolver and dispatchers.
pub struct Publisher {
    limiter: Arc<RateLimiter>,
    ledger: Ledger,
    resolver: SubscriberResolver,
    dispatchers: DispatcherRegistry,
    config: PublisherConfig,
}

impl Publisher {
    pub fn new(
        limiter: Arc<RateLimiter>,
        ledger: Ledger,
        resolver: SubscriberResolver,
        dispatchers: DispatcherRegistry,
        config: PublisherConfig,
    ) -> Self {
        Self {
            limiter,
            ledger,
            resolver,
            dispatchers,
            config,
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn dispatchers(&self) -> &DispatcherRegistry {
        &self.dispatchers
    }

    /// Rate-limited publish to every verified follower of the draft's topics.
    pub async fn publish(&self, draft: PublishDraft) -> Result<Vec<PublishEntry>, PublishError> {
        self.admit().await?;
        let publication = draft.resolve(&self.config.default_sender)?;
        self.deliver(publication).await
    }

    /// Record one publish attempt against the rate limiter.
    ///
    /// [`Publisher::publish`] calls this first. Callers that reject a publish
    /// before a draft exists (an undecodable body) call it directly so the
    /// attempt still counts.
    pub async fn admit(&self) -> Result<(), PublishError> {
        let admission = self.limiter.admit().await;
        if admission.is_exceeded() {
            let attempts = admission.attempts();
            tracing::error!(
                attempts,
                threshold = self.limiter.threshold(),
                "Publish rate limit exceeded"
            );
            self.report_rate_limit(attempts).await;
            return Err(PublishError::RateLimited { attempts });
        }
        Ok(())
    }

    /// Publish an error or developer notice, bypassing the rate limiter.
    pub async fn notify(
        &self,
        kind: NoticeKind,
        notice: Notice,
    ) -> Result<Vec<PublishEntry>, PublishError> {
        let route = match kind {
            NoticeKind::Error => &self.config.error_route,
            NoticeKind::Developer => &self.config.notice_route,
        };
        let publication =
            notice.into_publication(kind, route, &self.config.default_sender, Utc::now())?;
        self.deliver(publication).await
    }

    /// Deliver a validated publication: dedup, resolve, dispatch, log.
    pub async fn deliver(&self, publication: Publication) -> Result<Vec<PublishEntry>, PublishError> {
        if !self.ledger.is_fresh(&publication.id).await? {
            tracing::info!(id = %publication.id, "Duplicate publish id rejected");
            return Err(PublishError::DuplicateId(publication.id));
        }

        let resolution = self.resolver.resolve(&publication.topics).await?;

        let mut entries: Vec<PublishEntry> = resolution
            .dangling
            .iter()
            .map(|id| PublishEntry::dangling(id))
            .collect();

        let units = self.plan(&publication, &resolution.subscribers);
        let destinations = attempted_destinations(&units);
        let results = self.dispatch(units).await;
        let succeeded = results
            .iter()
            .filter(|e| e.as_delivery().is_some_and(|d| d.success))
            .count();
        let attempted = results.len();
        entries.extend(results);

        let entry = NewLogEntry {
            id: publication.id.clone(),
            destination: destinations,
            medium: publication.media.iter().map(|m| m.as_str().to_string()).collect(),
            message: publication.message.clone(),
            topics: Some(publication.topics_summary()),
        };
        self.commit(&entry).await?;

        tracing::info!(
            id = %publication.id,
            subscribers = resolution.subscribers.len(),
            attempted,
            succeeded,
            "Message published"
        );
        Ok(entries)
    }

    /// Send one message to explicit addresses through a single medium.
    ///
    /// Not rate limited. The send is logged under a generated `G…` id.
    pub async fn send_direct(
        &self,
        medium: Medium,
        destinations: &[String],
        message: DirectMessage,
    ) -> Result<DirectSend, PublishError> {
        let destinations: Vec<String> = destinations
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if destinations.is_empty() {
            return Err(CoreError::Validation("at least one destination is required".to_string()).into());
        }

        let sender = message
            .sender
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.config.default_sender.clone());

        let units = match self.dispatchers.get(medium) {
            Some(dispatcher) => destinations
                .iter()
                .map(|destination| DispatchUnit::Send {
                    dispatcher: Arc::clone(&dispatcher),
                    outbound: Outbound {
                        destination: destination.clone(),
                        subject: message.subject.clone(),
                        body: message.body.clone(),
                        html: message.html.clone(),
                        sender: sender.clone(),
                    },
                })
                .collect(),
            None => vec![DispatchUnit::Unconfigured(medium)],
        };

        let entries = self.dispatch(units).await;

        let log_id = direct_send_id();
        let entry = NewLogEntry {
            id: log_id.clone(),
            destination: destinations,
            medium: vec![medium.as_str().to_string()],
            message: message.body,
            topics: None,
        };
        self.commit(&entry).await?;

        tracing::info!(log_id = %log_id, medium = %medium, "Direct message sent");
        Ok(DirectSend { log_id, entries })
    }

    /// Build the dispatch units for a publication, subscriber-major.
    ///
    /// A requested medium without a dispatcher yields one unit for the whole
    /// call. A subscriber without an address for a medium is skipped.
    fn plan(&self, publication: &Publication, subscribers: &[Subscriber]) -> Vec<DispatchUnit> {
        let mut units: Vec<DispatchUnit> = publication
            .media
            .iter()
            .filter(|m| self.dispatchers.get(**m).is_none())
            .map(|m| DispatchUnit::Unconfigured(*m))
            .collect();

        for subscriber in subscribers {
            let fields = subscriber.merge_fields();
            let body = merge_keywords(&publication.message, &fields);
            let sms_body = merge_keywords(&publication.sms_message, &fields);
            let html = merge_keywords(&publication.html_message, &fields);

            for medium in &publication.media {
                let Some(dispatcher) = self.dispatchers.get(*medium) else {
                    continue;
                };
                let Some(destination) = address_for(*medium, subscriber) else {
                    continue;
                };
                let outbound = Outbound {
                    destination,
                    subject: publication.subject.clone(),
                    body: match medium {
                        Medium::Sms => sms_body.clone(),
                        _ => body.clone(),
                    },
                    html: (*medium == Medium::Email).then(|| html.clone()),
                    sender: publication.sender.clone(),
                };
                units.push(DispatchUnit::Send {
                    dispatcher,
                    outbound,
                });
            }
        }
        units
    }

    /// Run every unit and wait for all of them. Output order matches input order.
    async fn dispatch(&self, units: Vec<DispatchUnit>) -> Vec<PublishEntry> {
        let timeout = self.config.dispatch_timeout;
        stream::iter(units)
            .map(move |unit| run_unit(unit, timeout))
            .buffered(self.config.dispatch_concurrency.max(1))
            .collect()
            .await
    }

    async fn commit(&self, entry: &NewLogEntry) -> Result<(), PublishError> {
        match self.ledger.record(entry).await {
            Ok(Recorded::Written) => Ok(()),
            Ok(Recorded::Truncated) => {
                tracing::warn!(id = %entry.id, "Message logged with truncated body");
                Ok(())
            }
            Ok(Recorded::AlreadyLogged) => {
                tracing::warn!(
                    id = %entry.id,
                    "Concurrent publish with the same id logged first"
                );
                Ok(())
            }
            Err(source) => Err(PublishError::LogWrite {
                id: entry.id.clone(),
                source,
            }),
        }
    }

    async fn report_rate_limit(&self, attempts: usize) {
        let notice = Notice {
            message: format!(
                "The hermes messaging rate limit has been exceeded. \
                 There have been {attempts} attempts to publish in the last hour."
            ),
            subject: Some(RATE_LIMIT_SUBJECT.to_string()),
            medium: Some(vec![
                Medium::Slack.as_str().to_string(),
                Medium::Email.as_str().to_string(),
                Medium::Sms.as_str().to_string(),
            ]),
            ..Default::default()
        };
        if let Err(e) = self.notify(NoticeKind::Error, notice).await {
            tracing::error!(error = %e, "Failed to send rate limit notice");
        }
    }
}

/// Union of the addresses the units will attempt, in first-seen order.
fn attempted_destinations(units: &[DispatchUnit]) -> Vec<String> {
    let mut destinations: Vec<String> = Vec::new();
    for destination in units.iter().filter_map(DispatchUnit::destination) {
        if !destinations.iter().any(|d| d == destination) {
            destinations.push(destination.to_string());
        }
    }
    destinations
}

async fn run_unit(unit: DispatchUnit, timeout: Duration) -> PublishEntry {
    let (dispatcher, outbound) = match unit {
        DispatchUnit::Unconfigured(medium) => {
            tracing::warn!(medium = %medium, "No dispatcher registered for medium");
            return PublishEntry::Delivery(DeliveryResult::unconfigured(medium));
        }
        DispatchUnit::Send {
            dispatcher,
            outbound,
        } => (dispatcher, outbound),
    };

    let medium = dispatcher.medium();
    let outcome = match tokio::time::timeout(timeout, dispatcher.send(&outbound)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(DeliveryError::Timeout(timeout)),
    };
    if let Err(e) = &outcome {
        tracing::warn!(
            medium = %medium,
            destination = %outbound.destination,
            error = %e,
            "Dispatch failed"
        );
    }
    PublishEntry::Delivery(DeliveryResult::from_outcome(medium, outbound, outcome))
}
