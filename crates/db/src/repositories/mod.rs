//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod message_log_repo;
pub mod subscriber_repo;
pub mod subscription_repo;

pub use message_log_repo::MessageLogRepo;
pub use subscriber_repo::SubscriberRepo;
pub use subscription_repo::SubscriptionRepo;
