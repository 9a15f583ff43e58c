//! Hermes HTTP gateway library.
//!
//! Exposes configuration, state, error mapping and routes so integration
//! tests and the binary entrypoint build the same application.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod router;
pub mod routes;
pub mod state;
