//! Subscription (subscriber ↔ topic join row) model.

use hermes_core::types::EntityId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `subscriptions` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Subscription {
    pub id: EntityId,
    pub subscriber_id: EntityId,
    pub topic_id: String,
}
