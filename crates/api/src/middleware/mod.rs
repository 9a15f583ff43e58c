//! Request extractors applied by handlers.
//!
//! - [`auth::ApiKey`] -- Requires the configured bearer key, when one is set.

pub mod auth;
