//! Subscriber resolution: which verified subscribers follow a topic set.
//!
//! Two strategies produce the same result set:
//!
//! - [`ResolutionStrategy::ScanFilter`] scans subscribers whose own topic
//!   list contains each topic and unions the results.
//! - [`ResolutionStrategy::IndexJoin`] reads subscription rows by topic,
//!   batch-fetches the referenced subscribers and drops unverified ones.
//!   A subscription whose subscriber record is missing is dangling: the
//!   subscriber id is deleted from the directory and reported back.
//!
//! In both cases each subscriber appears once, ordered by id.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hermes_core::error::CoreError;
use hermes_db::models::subscriber::Subscriber;
use hermes_db::{StoreError, SubscriberDirectory};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionStrategy {
    #[default]
    ScanFilter,
    IndexJoin,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolutionStrategy::ScanFilter => "scan",
            ResolutionStrategy::IndexJoin => "index",
        })
    }
}

impl FromStr for ResolutionStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" | "scan-filter" => Ok(ResolutionStrategy::ScanFilter),
            "index" | "index-join" => Ok(ResolutionStrategy::IndexJoin),
            other => Err(CoreError::Validation(format!(
                "Unknown resolution strategy '{other}' (expected scan or index)"
            ))),
        }
    }
}

/// Result of resolving a topic set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Verified subscribers following at least one topic, unique and ordered by id.
    pub subscribers: Vec<Subscriber>,
    /// Subscriber ids referenced by subscriptions but missing from the directory.
    pub dangling: Vec<String>,
}

pub struct SubscriberResolver {
    directory: Arc<dyn SubscriberDirectory>,
    strategy: ResolutionStrategy,
    broadcast_topic: Option<String>,
}

impl SubscriberResolver {
    pub fn new(directory: Arc<dyn SubscriberDirectory>, strategy: ResolutionStrategy) -> Self {
        Self {
            directory,
            strategy,
            broadcast_topic: None,
        }
    }

    /// Also resolve followers of `topic` on every call.
    pub fn with_broadcast_topic(mut self, topic: Option<String>) -> Self {
        self.broadcast_topic = topic.filter(|t| !t.trim().is_empty());
        self
    }

    /// The requested topics plus the broadcast topic, without repeats.
    fn topic_set(&self, topics: &[String]) -> BTreeSet<String> {
        topics
            .iter()
            .cloned()
            .chain(self.broadcast_topic.clone())
            .collect()
    }

    pub async fn resolve(&self, topics: &[String]) -> Result<Resolution, StoreError> {
        let topics = self.topic_set(topics);
        let resolution = match self.strategy {
            ResolutionStrategy::ScanFilter => self.scan_filter(&topics).await?,
            ResolutionStrategy::IndexJoin => self.index_join(&topics).await?,
        };
        tracing::debug!(
            strategy = %self.strategy,
            topics = ?topics,
            subscribers = resolution.subscribers.len(),
            dangling = resolution.dangling.len(),
            "Topics resolved"
        );
        Ok(resolution)
    }

    async fn scan_filter(&self, topics: &BTreeSet<String>) -> Result<Resolution, StoreError> {
        let mut by_id = BTreeMap::new();
        for topic in topics {
            for subscriber in self.directory.scan_topic(topic).await? {
                if subscriber.verified {
                    by_id.entry(subscriber.id.clone()).or_insert(subscriber);
                }
            }
        }
        Ok(Resolution {
            subscribers: by_id.into_values().collect(),
            dangling: Vec::new(),
        })
    }

    async fn index_join(&self, topics: &BTreeSet<String>) -> Result<Resolution, StoreError> {
        let mut ids = BTreeSet::new();
        for topic in topics {
            for subscription in self.directory.subscriptions_for_topic(topic).await? {
                ids.insert(subscription.subscriber_id);
            }
        }

        let ids: Vec<String> = ids.into_iter().collect();
        let found = self.directory.get_many(&ids).await?;
        let present: BTreeSet<&str> = found.iter().map(|s| s.id.as_str()).collect();

        let mut dangling = Vec::new();
        for id in ids.iter().filter(|id| !present.contains(id.as_str())) {
            self.heal(id).await;
            dangling.push(id.clone());
        }

        let mut by_id = BTreeMap::new();
        for subscriber in found.into_iter().filter(|s| s.verified) {
            by_id.entry(subscriber.id.clone()).or_insert(subscriber);
        }

        Ok(Resolution {
            subscribers: by_id.into_values().collect(),
            dangling,
        })
    }

    /// Delete a subscriber id left behind by orphaned subscriptions.
    ///
    /// Failures are logged only; the id is reported as dangling either way.
    async fn heal(&self, subscriber_id: &str) {
        match self.directory.delete(subscriber_id).await {
            Ok(_) => tracing::warn!(
                subscriber_id,
                "Subscriber missing for subscription, deleted dangling subscriptions"
            ),
            Err(e) => tracing::error!(
                subscriber_id,
                error = %e,
                "Failed to delete dangling subscriptions"
            ),
        }
    }
}
