use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::pipeline::run_generation_pipeline;
use crate::AppState;

/// POST /api/pipeline/start/:project_id
///
/// Schedules the batch job and acknowledges immediately.
pub async fn start(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let dispatcher = state.agent.dispatcher();
    let spawned_project = project_id.clone();
    tokio::spawn(async move {
        run_generation_pipeline(store, dispatcher, &spawned_project).await;
    });

    Json(json!({ "status": "started", "project_id": project_id }))
}
