//! Subscriber entity model and DTOs.

use hermes_core::merge::merge_fields;
use hermes_core::types::{new_hex_id, EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// A row from the `subscribers` table.
///
/// Subscribers are never partially updated: a changed subscriber is deleted
/// and re-created, and the only in-place mutation is flipping `verified`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: EntityId,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub email: String,
    pub sms: Option<String>,
    pub slack: Option<String>,
    pub topics: Vec<String>,
    pub verified: bool,
    pub created_at: Timestamp,
}

impl Subscriber {
    /// Build a new subscriber with a freshly assigned hex id.
    pub fn new(input: CreateSubscriber) -> Self {
        Self {
            id: new_hex_id(),
            first_name: input.first_name,
            last_name: input.last_name,
            country: input.country,
            email: input.email,
            sms: input.sms.filter(|s| !s.is_empty()),
            slack: input.slack.filter(|s| !s.is_empty()),
            topics: input.topics,
            verified: input.verified,
            created_at: chrono::Utc::now(),
        }
    }

    /// Attributes available to `<<placeholder>>` substitution.
    pub fn merge_fields(&self) -> Map<String, Value> {
        merge_fields(self)
    }
}

/// DTO for creating a new subscriber.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriber {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub country: String,
    #[serde(default)]
    pub sms: Option<String>,
    #[serde(default)]
    pub slack: Option<String>,
    pub topics: Vec<String>,
    #[serde(default)]
    pub verified: bool,
}
