use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api;
use crate::app::SharedState;

/// Create the axum router with all routes.
pub fn create_router(state: SharedState) -> Router {
    let uploads = Router::new()
        .route("/api/sessions/{id}/image", post(api::session::upload_image))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes()));

    Router::new()
        // --- Core ---
        .route("/status", get(status_handler))
        .route("/api/help", get(api::session::get_help))
        // --- Sessions ---
        .route("/api/sessions/{id}/commands/{token}", post(api::session::apply_command))
        .route("/api/sessions/{id}/state", get(api::session::get_state))
        .route("/api/sessions/{id}/preview", get(api::session::get_preview))
        .route("/api/sessions/{id}/final/{sheet}", get(api::session::get_final))
        .route("/api/sessions/{id}/stats", get(api::stats::get_stats))
        .merge(uploads)
        // --- Middleware ---
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn status_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
