//! Background generation pipeline — walks a project's pending scenes and
//! triggers image then video generation for each, sequentially.
//!
//! Partial failure is the default policy: a scene that cannot be processed
//! is marked `failed` with its reason and the remaining scenes still run.

use std::sync::Arc;

use crate::agent::tools::ToolDispatcher;
use crate::store::types::{PendingScene, SceneStatus};
use crate::store::ProjectStore;
use crate::trace::TraceEvent;

/// Process every `pending_generation` scene of a project in `scene_order`.
///
/// Spawned from the HTTP layer; never fails the caller. Errors are recorded
/// per scene and logged.
pub async fn run_generation_pipeline(
    store: Arc<dyn ProjectStore>,
    dispatcher: Arc<ToolDispatcher>,
    project_id: &str,
) {
    tracing::info!(project_id, "starting generation pipeline");

    let scenes = match store.pending_scenes(project_id).await {
        Ok(scenes) => scenes,
        Err(e) => {
            tracing::error!(project_id, error = %e, "cannot load pending scenes, aborting pipeline");
            return;
        }
    };

    if scenes.is_empty() {
        tracing::info!(project_id, "no pending scenes");
        return;
    }
    tracing::info!(project_id, pending = scenes.len(), "processing pending scenes");

    for scene in &scenes {
        let outcome = process_scene(&store, &dispatcher, scene).await;

        let status = match outcome {
            Ok(()) => SceneStatus::Completed,
            Err(reason) => {
                tracing::error!(scene_id = %scene.id, %reason, "scene failed");
                if let Err(e) = store
                    .update_scene_status(&scene.id, SceneStatus::Failed, Some(&reason))
                    .await
                {
                    tracing::error!(scene_id = %scene.id, error = %e, "failed to record scene failure");
                }
                SceneStatus::Failed
            }
        };

        TraceEvent::PipelineSceneDone {
            scene_id: scene.id.clone(),
            status: status.as_str().into(),
        }
        .emit();
    }

    tracing::info!(project_id, "generation pipeline finished");
}

/// Drive one scene through image and video generation, marking progress on
/// the scene row. Returns the failure reason on error; marks `completed`
/// itself on success.
async fn process_scene(
    store: &Arc<dyn ProjectStore>,
    dispatcher: &Arc<ToolDispatcher>,
    scene: &PendingScene,
) -> Result<(), String> {
    let prompt = scene
        .image_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "missing image prompt".to_string())?;

    store
        .update_scene_status(&scene.id, SceneStatus::GeneratingImage, None)
        .await
        .map_err(|e| e.to_string())?;
    let image = dispatcher
        .trigger_image_generation(&scene.id, prompt, "v2")
        .await
        .map_err(|e| e.to_string())?;
    ensure_success("image generation", &image)?;

    store
        .update_scene_status(&scene.id, SceneStatus::GeneratingVideo, None)
        .await
        .map_err(|e| e.to_string())?;
    let video = dispatcher
        .trigger_video_generation(&scene.id)
        .await
        .map_err(|e| e.to_string())?;
    ensure_success("video generation", &video)?;

    store
        .update_scene_status(&scene.id, SceneStatus::Completed, None)
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Handlers report domain failures as `{"success": false, "error": ...}`
/// rather than raising; surface those as scene failures too.
fn ensure_success(step: &str, value: &serde_json::Value) -> Result<(), String> {
    match value.get("success").and_then(|v| v.as_bool()) {
        Some(false) => Err(value
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{step} reported failure"))),
        _ => Ok(()),
    }
}
