//! Usage counters API.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::app::SharedState;
use crate::services::workflow::SessionService;

use super::service_err;

/// GET /api/sessions/{id}/stats
pub async fn get_stats(
    State(state): State<SharedState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let stats = SessionService::new(state)
        .stats(user_id)
        .map_err(service_err)?;
    Ok(Json(json!({ "status": "ok", "stats": stats })))
}
