use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Called by the delivery collaborator once its chat connection is up;
/// releases the periodic loops.
pub async fn mark_ready(State(state): State<AppState>) -> StatusCode {
    state.ready.notify_ready();
    StatusCode::NO_CONTENT
}
