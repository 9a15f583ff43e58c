//! Route definitions for ad hoc single-channel sends.

use axum::routing::put;
use axum::Router;

use crate::handlers::direct;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email", put(direct::send_email))
        .route("/sms", put(direct::send_sms))
        .route("/gcm", put(direct::send_push))
}
