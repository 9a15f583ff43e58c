//! Request handlers for the gateway routes.
//!
//! Each submodule decodes one area's requests, hands them to the
//! [`Publisher`](hermes_delivery::Publisher) or the subscriber directory,
//! and maps failures via [`AppError`](crate::error::AppError).

pub mod direct;
pub mod log;
pub mod notify;
pub mod publish;
pub mod subscribe;
