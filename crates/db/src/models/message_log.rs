//! Message log entry model and DTOs.

use hermes_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Replacement message stored when the original is too large to log.
pub const MESSAGE_TOO_LARGE: &str = "Message too large to log.";

/// A row from the `message_log` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct LogEntry {
    pub id: EntityId,
    pub destination: Vec<String>,
    pub medium: Vec<String>,
    pub message: String,
    pub topics: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for inserting a log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub id: EntityId,
    pub destination: Vec<String>,
    pub medium: Vec<String>,
    pub message: String,
    pub topics: Option<String>,
}

impl NewLogEntry {
    /// A copy with the message body swapped for [`MESSAGE_TOO_LARGE`].
    pub fn truncated(&self) -> Self {
        Self {
            message: MESSAGE_TOO_LARGE.to_string(),
            ..self.clone()
        }
    }
}
