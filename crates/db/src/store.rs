//! Store traits consumed by the delivery engine.
//!
//! [`SubscriberDirectory`] and [`MessageLog`] are the only storage seams the
//! publish path depends on. [`PgSubscriberDirectory`] and [`PgMessageLog`]
//! adapt the PostgreSQL repositories; [`crate::memory`] provides in-process
//! implementations.

use async_trait::async_trait;

use crate::models::message_log::{LogEntry, NewLogEntry};
use crate::models::subscriber::Subscriber;
use crate::models::subscription::Subscription;
use crate::repositories::{MessageLogRepo, SubscriberRepo, SubscriptionRepo};
use crate::DbPool;

/// Default upper bound on the logged message body, in bytes.
pub const DEFAULT_MAX_LOG_MESSAGE_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// The record exceeds a size limit of the backing store.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // PostgreSQL class 54: program limit exceeded (row/field too large).
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().is_some_and(|c| c.starts_with("54")) {
                return StoreError::PayloadTooLarge(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Account/subscriber directory.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// Fetch one subscriber.
    async fn get(&self, id: &str) -> Result<Option<Subscriber>, StoreError>;

    /// Batch-fetch subscribers, ordered by id. Ids without a record are skipped.
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Subscriber>, StoreError>;

    /// Store a subscriber, replacing any existing record with the same id.
    async fn put(&self, subscriber: &Subscriber) -> Result<(), StoreError>;

    /// Delete a subscriber together with every subscription that references it.
    ///
    /// Returns `true` if anything was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Verified subscribers whose topic list contains `topic`, ordered by id.
    async fn scan_topic(&self, topic: &str) -> Result<Vec<Subscriber>, StoreError>;

    /// Subscription rows for `topic`, including rows whose subscriber is gone.
    async fn subscriptions_for_topic(&self, topic: &str) -> Result<Vec<Subscription>, StoreError>;

    /// Create one subscription per topic for `subscriber_id`.
    async fn create_subscriptions(
        &self,
        subscriber_id: &str,
        topics: &[String],
    ) -> Result<Vec<Subscription>, StoreError>;

    /// Mark a subscriber verified, creating its subscriptions on first verification.
    async fn verify(&self, id: &str) -> Result<Option<Subscriber>, StoreError>;

    /// Confirm the backing store is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Message log, used for both audit and idempotency.
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<LogEntry>, StoreError>;

    /// Whether an entry with this id has been logged.
    async fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Insert unless an entry with the same id exists. Returns `true` on insert.
    async fn insert_if_absent(&self, entry: &NewLogEntry) -> Result<bool, StoreError>;

    /// Returns `true` if an entry was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL adapters
// ---------------------------------------------------------------------------

/// [`SubscriberDirectory`] over the `subscribers` and `subscriptions` tables.
#[derive(Clone)]
pub struct PgSubscriberDirectory {
    pool: DbPool,
}

impl PgSubscriberDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberDirectory for PgSubscriberDirectory {
    async fn get(&self, id: &str) -> Result<Option<Subscriber>, StoreError> {
        Ok(SubscriberRepo::find_by_id(&self.pool, id).await?)
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Subscriber>, StoreError> {
        Ok(SubscriberRepo::find_many(&self.pool, ids).await?)
    }

    async fn put(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        Ok(SubscriberRepo::upsert(&self.pool, subscriber).await?)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(SubscriberRepo::delete_cascade(&self.pool, id).await?)
    }

    async fn scan_topic(&self, topic: &str) -> Result<Vec<Subscriber>, StoreError> {
        Ok(SubscriberRepo::list_verified_by_topic(&self.pool, topic).await?)
    }

    async fn subscriptions_for_topic(&self, topic: &str) -> Result<Vec<Subscription>, StoreError> {
        Ok(SubscriptionRepo::list_by_topic(&self.pool, topic).await?)
    }

    async fn create_subscriptions(
        &self,
        subscriber_id: &str,
        topics: &[String],
    ) -> Result<Vec<Subscription>, StoreError> {
        Ok(SubscriptionRepo::create_for_subscriber(&self.pool, subscriber_id, topics).await?)
    }

    async fn verify(&self, id: &str) -> Result<Option<Subscriber>, StoreError> {
        let verified = SubscriberRepo::verify(&self.pool, id).await?;
        if let Some((subscriber, created)) = &verified {
            tracing::info!(
                subscriber_id = %subscriber.id,
                subscriptions = created.len(),
                "Subscriber verified"
            );
        }
        Ok(verified.map(|(subscriber, _)| subscriber))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

/// [`MessageLog`] over the `message_log` table.
#[derive(Clone)]
pub struct PgMessageLog {
    pool: DbPool,
    max_message_bytes: usize,
}

impl PgMessageLog {
    pub fn new(pool: DbPool, max_message_bytes: usize) -> Self {
        Self {
            pool,
            max_message_bytes,
        }
    }
}

#[async_trait]
impl MessageLog for PgMessageLog {
    async fn get(&self, id: &str) -> Result<Option<LogEntry>, StoreError> {
        Ok(MessageLogRepo::find_by_id(&self.pool, id).await?)
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(MessageLogRepo::exists(&self.pool, id).await?)
    }

    async fn insert_if_absent(&self, entry: &NewLogEntry) -> Result<bool, StoreError> {
        if entry.message.len() > self.max_message_bytes {
            return Err(StoreError::PayloadTooLarge(format!(
                "message is {} bytes, limit is {}",
                entry.message.len(),
                self.max_message_bytes
            )));
        }
        Ok(MessageLogRepo::insert_if_absent(&self.pool, entry).await?)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(MessageLogRepo::delete(&self.pool, id).await?)
    }
}
