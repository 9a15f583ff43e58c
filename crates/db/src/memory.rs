//! In-process store implementations.
//!
//! Used when `STORE_BACKEND=memory` and by the delivery and API test
//! suites. State is held behind a `tokio::sync::RwLock` and lost on restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use hermes_core::types::new_hex_id;
use tokio::sync::RwLock;

use crate::models::message_log::{LogEntry, NewLogEntry};
use crate::models::subscriber::Subscriber;
use crate::models::subscription::Subscription;
use crate::store::{MessageLog, StoreError, SubscriberDirectory, DEFAULT_MAX_LOG_MESSAGE_BYTES};

// ---------------------------------------------------------------------------
// Subscriber directory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DirectoryState {
    subscribers: BTreeMap<String, Subscriber>,
    subscriptions: BTreeMap<String, Subscription>,
}

/// In-memory [`SubscriberDirectory`].
#[derive(Default)]
pub struct MemorySubscriberDirectory {
    state: RwLock<DirectoryState>,
}

impl MemorySubscriberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw subscription row without touching the subscriber table.
    ///
    /// Lets callers reproduce rows left behind by manual edits.
    pub async fn insert_subscription(&self, subscription: Subscription) {
        self.state
            .write()
            .await
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Remove only the subscriber record, leaving its subscriptions behind.
    pub async fn remove_subscriber_record(&self, id: &str) -> bool {
        self.state.write().await.subscribers.remove(id).is_some()
    }

    /// Number of subscription rows referencing `subscriber_id`.
    pub async fn subscription_count(&self, subscriber_id: &str) -> usize {
        self.state
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| s.subscriber_id == subscriber_id)
            .count()
    }
}

fn subscription_rows(subscriber_id: &str, topics: &[String]) -> Vec<Subscription> {
    topics
        .iter()
        .map(|topic| Subscription {
            id: new_hex_id(),
            subscriber_id: subscriber_id.to_string(),
            topic_id: topic.clone(),
        })
        .collect()
}

#[async_trait]
impl SubscriberDirectory for MemorySubscriberDirectory {
    async fn get(&self, id: &str) -> Result<Option<Subscriber>, StoreError> {
        Ok(self.state.read().await.subscribers.get(id).cloned())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Subscriber>, StoreError> {
        let state = self.state.read().await;
        let mut found: Vec<Subscriber> = ids
            .iter()
            .filter_map(|id| state.subscribers.get(id).cloned())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.dedup_by(|a, b| a.id == b.id);
        Ok(found)
    }

    async fn put(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .subscribers
            .insert(subscriber.id.clone(), subscriber.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let removed_subscriber = state.subscribers.remove(id).is_some();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|_, s| s.subscriber_id != id);
        Ok(removed_subscriber || state.subscriptions.len() != before)
    }

    async fn scan_topic(&self, topic: &str) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .subscribers
            .values()
            .filter(|s| s.verified && s.topics.iter().any(|t| t == topic))
            .cloned()
            .collect())
    }

    async fn subscriptions_for_topic(&self, topic: &str) -> Result<Vec<Subscription>, StoreError> {
        let mut rows: Vec<Subscription> = self
            .state
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| s.topic_id == topic)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.subscriber_id.cmp(&b.subscriber_id).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create_subscriptions(
        &self,
        subscriber_id: &str,
        topics: &[String],
    ) -> Result<Vec<Subscription>, StoreError> {
        let rows = subscription_rows(subscriber_id, topics);
        let mut state = self.state.write().await;
        for row in &rows {
            state.subscriptions.insert(row.id.clone(), row.clone());
        }
        Ok(rows)
    }

    async fn verify(&self, id: &str) -> Result<Option<Subscriber>, StoreError> {
        let mut state = self.state.write().await;
        let Some(subscriber) = state.subscribers.get_mut(id) else {
            return Ok(None);
        };
        if subscriber.verified {
            return Ok(Some(subscriber.clone()));
        }
        subscriber.verified = true;
        let verified = subscriber.clone();
        for row in subscription_rows(&verified.id, &verified.topics) {
            state.subscriptions.insert(row.id.clone(), row);
        }
        Ok(Some(verified))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Message log
// ---------------------------------------------------------------------------

/// In-memory [`MessageLog`] with the same size limit as the PostgreSQL log.
pub struct MemoryMessageLog {
    entries: RwLock<HashMap<String, LogEntry>>,
    max_message_bytes: usize,
}

impl MemoryMessageLog {
    pub fn new(max_message_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_message_bytes,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryMessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_MESSAGE_BYTES)
    }
}

#[async_trait]
impl MessageLog for MemoryMessageLog {
    async fn get(&self, id: &str) -> Result<Option<LogEntry>, StoreError> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.entries.read().await.contains_key(id))
    }

    async fn insert_if_absent(&self, entry: &NewLogEntry) -> Result<bool, StoreError> {
        if entry.message.len() > self.max_message_bytes {
            return Err(StoreError::PayloadTooLarge(format!(
                "message is {} bytes, limit is {}",
                entry.message.len(),
                self.max_message_bytes
            )));
        }
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.id) {
            return Ok(false);
        }
        entries.insert(
            entry.id.clone(),
            LogEntry {
                id: entry.id.clone(),
                destination: entry.destination.clone(),
                medium: entry.medium.clone(),
                message: entry.message.clone(),
                topics: entry.topics.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(id).is_some())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscriber::CreateSubscriber;

    fn subscriber(topics: &[&str], verified: bool) -> Subscriber {
        Subscriber::new(CreateSubscriber {
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            email: "ann@example.org".to_string(),
            country: "demo".to_string(),
            sms: None,
            slack: None,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            verified,
        })
    }

    #[tokio::test]
    async fn scan_topic_returns_only_verified_followers() {
        let dir = MemorySubscriberDirectory::new();
        let verified = subscriber(&["a"], true);
        let unverified = subscriber(&["a"], false);
        dir.put(&verified).await.unwrap();
        dir.put(&unverified).await.unwrap();

        let found = dir.scan_topic("a").await.unwrap();
        assert_eq!(found, vec![verified]);
    }

    #[tokio::test]
    async fn delete_cascades_to_subscriptions() {
        let dir = MemorySubscriberDirectory::new();
        let s = subscriber(&["a", "b"], true);
        dir.put(&s).await.unwrap();
        dir.create_subscriptions(&s.id, &s.topics).await.unwrap();
        assert_eq!(dir.subscription_count(&s.id).await, 2);

        assert!(dir.delete(&s.id).await.unwrap());
        assert_eq!(dir.subscription_count(&s.id).await, 0);
        assert!(dir.get(&s.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verify_creates_subscriptions_once() {
        let dir = MemorySubscriberDirectory::new();
        let s = subscriber(&["a", "b"], false);
        dir.put(&s).await.unwrap();

        let verified = dir.verify(&s.id).await.unwrap().unwrap();
        assert!(verified.verified);
        dir.verify(&s.id).await.unwrap();
        assert_eq!(dir.subscription_count(&s.id).await, 2);
    }

    #[tokio::test]
    async fn verify_unknown_subscriber_returns_none() {
        let dir = MemorySubscriberDirectory::new();
        assert!(dir.verify("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn log_insert_is_conditional() {
        let log = MemoryMessageLog::default();
        let entry = NewLogEntry {
            id: "m1".to_string(),
            destination: vec![],
            medium: vec!["email".to_string()],
            message: "hi".to_string(),
            topics: None,
        };
        assert!(log.insert_if_absent(&entry).await.unwrap());
        assert!(!log.insert_if_absent(&entry).await.unwrap());
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn log_rejects_oversized_message() {
        let log = MemoryMessageLog::new(4);
        let entry = NewLogEntry {
            id: "m1".to_string(),
            destination: vec![],
            medium: vec![],
            message: "too long".to_string(),
            topics: None,
        };
        let err = log.insert_if_absent(&entry).await.unwrap_err();
        assert!(matches!(err, StoreError::PayloadTooLarge(_)));
        assert!(log.insert_if_absent(&entry.truncated()).await.is_err());
    }
}
