//! Repository for the `subscriptions` table.

use hermes_core::types::new_hex_id;
use sqlx::{PgConnection, PgPool};

use crate::models::subscription::Subscription;

/// Column list for `subscriptions` queries.
const COLUMNS: &str = "id, subscriber_id, topic_id";

/// Provides CRUD operations for subscriptions.
pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// Insert one subscription row per topic on an open connection or
    /// transaction, returning the created rows.
    pub async fn insert_for_topics(
        conn: &mut PgConnection,
        subscriber_id: &str,
        topics: &[String],
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscriptions (id, subscriber_id, topic_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let mut rows = Vec::with_capacity(topics.len());
        for topic in topics {
            let row = sqlx::query_as::<_, Subscription>(&query)
                .bind(new_hex_id())
                .bind(subscriber_id)
                .bind(topic)
                .fetch_one(&mut *conn)
                .await?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Create subscriptions for a subscriber in a single transaction.
    pub async fn create_for_subscriber(
        pool: &PgPool,
        subscriber_id: &str,
        topics: &[String],
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let rows = Self::insert_for_topics(&mut tx, subscriber_id, topics).await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// All subscription rows for a topic, ordered by subscriber id.
    pub async fn list_by_topic(pool: &PgPool, topic: &str) -> Result<Vec<Subscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE topic_id = $1 ORDER BY subscriber_id, id"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(topic)
            .fetch_all(pool)
            .await
    }

    /// All subscription rows for a subscriber.
    pub async fn list_by_subscriber(
        pool: &PgPool,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscriptions WHERE subscriber_id = $1 ORDER BY id");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(subscriber_id)
            .fetch_all(pool)
            .await
    }
}
