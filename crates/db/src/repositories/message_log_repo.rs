//! Repository for the `message_log` table.

use sqlx::PgPool;

use crate::models::message_log::{LogEntry, NewLogEntry};

/// Column list for `message_log` queries.
const COLUMNS: &str = "id, destination, medium, message, topics, created_at";

/// Provides CRUD operations for log entries.
pub struct MessageLogRepo;

impl MessageLogRepo {
    /// Find a log entry by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<LogEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM message_log WHERE id = $1");
        sqlx::query_as::<_, LogEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Whether an entry with this id has been logged.
    pub async fn exists(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM message_log WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Insert an entry unless one with the same id already exists.
    ///
    /// Returns `true` if the row was inserted.
    pub async fn insert_if_absent(pool: &PgPool, entry: &NewLogEntry) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO message_log (id, destination, medium, message, topics) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&entry.id)
        .bind(&entry.destination)
        .bind(&entry.medium)
        .bind(&entry.message)
        .bind(&entry.topics)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a log entry. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM message_log WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
