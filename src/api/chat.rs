use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub input: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Scene the user was looking at; accepted but unused for now.
    #[serde(default, rename = "sceneId")]
    pub scene_id: Option<String>,
    /// Accepted but unused for now.
    #[serde(default)]
    pub attachments: Option<Vec<serde_json::Value>>,
}

/// POST /api/chat/:project_id/send
pub async fn send_message(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<ChatMessageRequest>,
) -> impl IntoResponse {
    if req.input.trim().is_empty() {
        return Error::Validation("input must not be empty".into()).into_response();
    }
    if let Some(scene_id) = &req.scene_id {
        tracing::debug!(%scene_id, "chat request carries a scene context (unused)");
    }
    if req.attachments.as_ref().is_some_and(|a| !a.is_empty()) {
        tracing::debug!("chat request carries attachments (unused)");
    }

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat_request", %project_id, %request_id);

    match state
        .agent
        .process_chat_message(&project_id, req.thread_id, &req.input)
        .instrument(span)
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            tracing::error!(%project_id, error = %e, "chat request failed");
            e.into_response()
        }
    }
}
