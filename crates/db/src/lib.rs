//! Hermes storage layer.
//!
//! - [`models`] -- row structs for subscribers, subscriptions and log entries.
//! - [`repositories`] -- zero-sized PostgreSQL repositories.
//! - [`store`] -- the [`SubscriberDirectory`] and [`MessageLog`] traits the
//!   delivery engine depends on, with PostgreSQL adapters.
//! - [`memory`] -- in-process implementations of the same traits.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use store::{MessageLog, PgMessageLog, PgSubscriberDirectory, StoreError, SubscriberDirectory};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
