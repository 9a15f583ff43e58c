//! Repository for the `subscribers` table.

use sqlx::PgPool;

use crate::models::subscriber::Subscriber;
use crate::models::subscription::Subscription;
use crate::repositories::SubscriptionRepo;

/// Column list for `subscribers` queries.
const COLUMNS: &str =
    "id, first_name, last_name, country, email, sms, slack, topics, verified, created_at";

/// Provides CRUD operations for subscribers.
pub struct SubscriberRepo;

impl SubscriberRepo {
    /// Insert a subscriber, replacing any existing row with the same id.
    pub async fn upsert(pool: &PgPool, subscriber: &Subscriber) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO subscribers \
             (id, first_name, last_name, country, email, sms, slack, topics, verified, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET \
                first_name = EXCLUDED.first_name, \
                last_name = EXCLUDED.last_name, \
                country = EXCLUDED.country, \
                email = EXCLUDED.email, \
                sms = EXCLUDED.sms, \
                slack = EXCLUDED.slack, \
                topics = EXCLUDED.topics, \
                verified = EXCLUDED.verified",
        )
        .bind(&subscriber.id)
        .bind(&subscriber.first_name)
        .bind(&subscriber.last_name)
        .bind(&subscriber.country)
        .bind(&subscriber.email)
        .bind(&subscriber.sms)
        .bind(&subscriber.slack)
        .bind(&subscriber.topics)
        .bind(subscriber.verified)
        .bind(subscriber.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a subscriber by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Subscriber>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscribers WHERE id = $1");
        sqlx::query_as::<_, Subscriber>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Batch-fetch subscribers by id, ordered by id. Missing ids are skipped.
    pub async fn find_many(pool: &PgPool, ids: &[String]) -> Result<Vec<Subscriber>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscribers WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Subscriber>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Verified subscribers whose topic list contains `topic`, ordered by id.
    pub async fn list_verified_by_topic(
        pool: &PgPool,
        topic: &str,
    ) -> Result<Vec<Subscriber>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscribers \
             WHERE $1 = ANY(topics) AND verified = true \
             ORDER BY id"
        );
        sqlx::query_as::<_, Subscriber>(&query)
            .bind(topic)
            .fetch_all(pool)
            .await
    }

    /// Delete a subscriber and all of its subscriptions in one transaction.
    ///
    /// Returns `true` if either a subscriber or a subscription row was removed.
    pub async fn delete_cascade(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let subscribers = sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let subscriptions = sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(subscribers.rows_affected() + subscriptions.rows_affected() > 0)
    }

    /// Mark a subscriber verified and create its subscriptions.
    ///
    /// Subscriptions are only created on the unverified → verified
    /// transition, so repeating the call is a no-op. Returns `None` when the
    /// subscriber does not exist.
    pub async fn verify(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<(Subscriber, Vec<Subscription>)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE subscribers SET verified = true \
             WHERE id = $1 AND verified = false \
             RETURNING {COLUMNS}"
        );
        let flipped = sqlx::query_as::<_, Subscriber>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let result = match flipped {
            Some(subscriber) => {
                let subscriptions =
                    SubscriptionRepo::insert_for_topics(&mut tx, &subscriber.id, &subscriber.topics)
                        .await?;
                Some((subscriber, subscriptions))
            }
            None => {
                let query = format!("SELECT {COLUMNS} FROM subscribers WHERE id = $1");
                sqlx::query_as::<_, Subscriber>(&query)
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|s| (s, Vec::new()))
            }
        };

        tx.commit().await?;
        Ok(result)
    }
}
