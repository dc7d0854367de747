pub mod chat;
pub mod notify;
pub mod pipeline;

use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;

use crate::AppState;

/// Build the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        // ── Health ─────────────────────────────────────────────────
        .route("/", get(health))
        // ── Chat ───────────────────────────────────────────────────
        .route("/api/chat/:project_id/send", post(chat::send_message))
        // ── Canvas notifications ───────────────────────────────────
        .route("/api/agent/notify-update", post(notify::notify_update))
        // ── Generation pipeline ────────────────────────────────────
        .route("/api/pipeline/start/:project_id", post(pipeline::start))
}

/// GET /
async fn health() -> impl IntoResponse {
    Json(json!({
        "message": "agent backend is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
