//! Route definitions for the subscriber lifecycle.
//!
//! `/unsubscribe/{id}` is opened from message links and takes no API key.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::subscribe;
use crate::state::AppState;

/// ```text
/// PUT    /subscribe                 -> subscribe
/// GET    /subscribe/{id}            -> get_subscriber
/// DELETE /subscribe/{id}            -> delete_subscriber
/// GET    /unsubscribe/{id}          -> unsubscribe
/// PUT    /verify/{id}               -> verify
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", put(subscribe::subscribe))
        .route(
            "/subscribe/{id}",
            get(subscribe::get_subscriber).delete(subscribe::delete_subscriber),
        )
        .route("/unsubscribe/{id}", get(subscribe::unsubscribe))
        .route("/verify/{id}", put(subscribe::verify))
}
