//! Route definitions for publishing and notices.

use axum::routing::put;
use axum::Router;

use crate::handlers::{notify, publish};
use crate::state::AppState;

/// ```text
/// PUT    /publish                   -> publish
/// PUT    /error                     -> report_error
/// PUT    /notify                    -> notify_developers
/// GET    /notify                    -> notify_developers_query
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/publish", put(publish::publish))
        .route("/error", put(notify::report_error))
        .route(
            "/notify",
            put(notify::notify_developers).get(notify::notify_developers_query),
        )
}
