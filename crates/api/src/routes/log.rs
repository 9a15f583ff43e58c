use axum::routing::get;
use axum::Router;

use crate::handlers::log;
use crate::state::AppState;

/// ```text
/// GET    /log/{id}                  -> get_entry
/// DELETE /log/{id}                  -> delete_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/log/{id}", get(log::get_entry).delete(log::delete_entry))
}
