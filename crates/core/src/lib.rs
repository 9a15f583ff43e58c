//! Hermes core domain logic.
//!
//! Pure building blocks shared by the store, delivery and API crates. Nothing
//! in here performs I/O.

pub mod error;
pub mod medium;
pub mod merge;
pub mod publish;
pub mod rate_limit;
pub mod types;
