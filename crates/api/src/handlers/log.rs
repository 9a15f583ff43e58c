//! Handlers for the message log.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hermes_core::error::CoreError;
use hermes_db::models::message_log::LogEntry;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::ApiKey;
use crate::state::AppState;

fn not_found(id: String) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Message",
        id,
    })
}

/// GET /log/{id}
pub async fn get_entry(
    _key: ApiKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<LogEntry>> {
    let entry = state.log.get(&id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(entry))
}

/// DELETE /log/{id}
///
/// Frees the id for reuse by a later publish.
pub async fn delete_entry(
    _key: ApiKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if !state.log.delete(&id).await? {
        return Err(not_found(id));
    }
    tracing::info!(id = %id, "Message log entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
