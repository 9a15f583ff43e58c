//! Dedup ledger and audit logger over the message log.
//!
//! The same log serves both purposes: [`Ledger::is_fresh`] gates a publish
//! before any dispatch work, and [`Ledger::record`] writes the outcome once
//! dispatch has finished. The write is conditional on the id being absent,
//! so two concurrent publishes with the same id cannot both commit.

use std::sync::Arc;

use hermes_db::models::message_log::NewLogEntry;
use hermes_db::{MessageLog, StoreError};

/// Outcome of a successful [`Ledger::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// The entry was written as given.
    Written,
    /// The first write was rejected as too large and the entry was written
    /// with its message replaced by the too-large sentinel.
    Truncated,
    /// Another publish with the same id committed first.
    AlreadyLogged,
}

#[derive(Clone)]
pub struct Ledger {
    log: Arc<dyn MessageLog>,
}

impl Ledger {
    pub fn new(log: Arc<dyn MessageLog>) -> Self {
        Self { log }
    }

    /// `true` when no entry with this id has been logged.
    pub async fn is_fresh(&self, id: &str) -> Result<bool, StoreError> {
        Ok(!self.log.exists(id).await?)
    }

    /// Write the log entry, retrying once with a truncated message when the
    /// store rejects it as too large.
    ///
    /// Any other write error, and a failure of the retry, is returned to the
    /// caller.
    pub async fn record(&self, entry: &NewLogEntry) -> Result<Recorded, StoreError> {
        let first = match self.log.insert_if_absent(entry).await {
            Ok(true) => return Ok(Recorded::Written),
            Ok(false) => return Ok(Recorded::AlreadyLogged),
            Err(e @ StoreError::PayloadTooLarge(_)) => e,
            Err(e) => {
                tracing::error!(id = %entry.id, error = %e, "Log write failed");
                return Err(e);
            }
        };

        tracing::warn!(id = %entry.id, error = %first, "Log write failed, retrying with truncated message");

        match self.log.insert_if_absent(&entry.truncated()).await {
            Ok(true) => Ok(Recorded::Truncated),
            Ok(false) => Ok(Recorded::AlreadyLogged),
            Err(e) => {
                tracing::error!(id = %entry.id, error = %e, "Log write failed after retry");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use hermes_db::memory::MemoryMessageLog;
    use hermes_db::models::message_log::{LogEntry, MESSAGE_TOO_LARGE};

    use super::*;

    /// Memory log whose first insert fails with a pool timeout.
    struct FlakyLog {
        inner: MemoryMessageLog,
        failed: AtomicBool,
    }

    #[async_trait]
    impl MessageLog for FlakyLog {
        async fn get(&self, id: &str) -> Result<Option<LogEntry>, StoreError> {
            self.inner.get(id).await
        }

        async fn exists(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.exists(id).await
        }

        async fn insert_if_absent(&self, entry: &NewLogEntry) -> Result<bool, StoreError> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.insert_if_absent(entry).await
        }

        async fn delete(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }
    }

    fn entry(id: &str, message: &str) -> NewLogEntry {
        NewLogEntry {
            id: id.to_string(),
            destination: vec![],
            medium: vec!["email".to_string()],
            message: message.to_string(),
            topics: Some("Published to: [a]".to_string()),
        }
    }

    #[tokio::test]
    async fn fresh_until_recorded() {
        let log = Arc::new(MemoryMessageLog::default());
        let ledger = Ledger::new(log);

        assert!(ledger.is_fresh("m1").await.unwrap());
        assert_eq!(ledger.record(&entry("m1", "hi")).await.unwrap(), Recorded::Written);
        assert!(!ledger.is_fresh("m1").await.unwrap());
        assert_eq!(
            ledger.record(&entry("m1", "again")).await.unwrap(),
            Recorded::AlreadyLogged
        );
    }

    #[tokio::test]
    async fn oversized_message_is_logged_truncated() {
        let log = Arc::new(MemoryMessageLog::new(32));
        let ledger = Ledger::new(log.clone());

        let recorded = ledger.record(&entry("m1", &"x".repeat(100))).await.unwrap();
        assert_eq!(recorded, Recorded::Truncated);
        assert_eq!(log.get("m1").await.unwrap().unwrap().message, MESSAGE_TOO_LARGE);
    }

    #[tokio::test]
    async fn second_failure_is_returned() {
        // Limit smaller than the sentinel itself.
        let log = Arc::new(MemoryMessageLog::new(4));
        let ledger = Ledger::new(log);

        let err = ledger.record(&entry("m1", "too long")).await.unwrap_err();
        assert_matches!(err, StoreError::PayloadTooLarge(_));
    }

    #[tokio::test]
    async fn database_error_is_returned_without_truncating() {
        let log = Arc::new(FlakyLog {
            inner: MemoryMessageLog::default(),
            failed: AtomicBool::new(false),
        });
        let ledger = Ledger::new(log.clone());

        let err = ledger.record(&entry("m1", "hi")).await.unwrap_err();
        assert_matches!(err, StoreError::Database(sqlx::Error::PoolTimedOut));
        assert!(log.get("m1").await.unwrap().is_none());

        // The next write goes through with the original message.
        assert_eq!(ledger.record(&entry("m1", "hi")).await.unwrap(), Recorded::Written);
        assert_eq!(log.get("m1").await.unwrap().unwrap().message, "hi");
    }
}
