/// Subscribers, subscriptions and log entries are keyed by opaque strings.
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a new 32-character hex identifier.
pub fn new_hex_id() -> EntityId {
    uuid::Uuid::new_v4().simple().to_string()
}
