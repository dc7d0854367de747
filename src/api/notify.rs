use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: NotificationDetail,
}

#[derive(Debug, Deserialize)]
pub struct NotificationDetail {
    #[serde(rename = "sceneId")]
    pub scene_id: String,
    pub field: String,
    pub value: serde_json::Value,
}

/// POST /api/agent/notify-update
///
/// Acknowledges immediately; relaying the update into the project's thread
/// happens fire-and-forget so a slow assistant API never blocks the caller.
pub async fn notify_update(
    State(state): State<AppState>,
    Json(notification): Json<NotificationPayload>,
) -> impl IntoResponse {
    tracing::info!(
        kind = %notification.kind,
        scene_id = %notification.payload.scene_id,
        field = %notification.payload.field,
        "canvas notification received"
    );

    let agent = state.agent.clone();
    let detail = notification.payload;
    tokio::spawn(async move {
        if let Err(e) = agent
            .handle_scene_update(&detail.scene_id, &detail.field, &detail.value)
            .await
        {
            tracing::error!(scene_id = %detail.scene_id, error = %e, "failed to relay canvas update");
        }
    });

    Json(json!({ "status": "received" }))
}
