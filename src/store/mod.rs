pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// Seam over the relational project store.
///
/// Backed by [`client::StoreClient`] in production; tests substitute an
/// in-memory fake. The store is the source of truth for thread mappings and
/// scene rows; the orchestrator caches nothing across requests.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Look up the thread mapped to a project, if any.
    async fn thread_for_project(&self, project_id: &str) -> Result<Option<String>>;

    /// Upsert the project→thread mapping (conflict on `project_id`) and
    /// return the thread id of the surviving row.
    async fn save_thread_mapping(&self, project_id: &str, thread_id: &str) -> Result<String>;

    /// Project title plus its scene summaries, or None when unknown.
    async fn project_details(&self, project_id: &str) -> Result<Option<ProjectDetails>>;

    /// Replace a scene's script, stamping `updated_at`.
    async fn update_scene_script(&self, scene_id: &str, script: &str) -> Result<()>;

    /// Highest `scene_order` in the project, or None when it has no scenes.
    async fn max_scene_order(&self, project_id: &str) -> Result<Option<i64>>;

    /// Insert scenes and return their new ids, in insertion order.
    async fn insert_scenes(&self, scenes: &[NewScene]) -> Result<Vec<String>>;

    /// Media-related columns needed by the generation handlers.
    async fn scene_media(&self, scene_id: &str) -> Result<Option<SceneMedia>>;

    /// Set a scene's status; `Some(message)` records a failure reason and
    /// `None` clears any previous one.
    async fn update_scene_status(
        &self,
        scene_id: &str,
        status: SceneStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Scenes awaiting generation for a project, ordered by `scene_order`.
    async fn pending_scenes(&self, project_id: &str) -> Result<Vec<PendingScene>>;

    /// The project a scene belongs to, if the scene exists.
    async fn scene_project(&self, scene_id: &str) -> Result<Option<String>>;

    /// Record a submitted generation job.
    async fn insert_generation_job(&self, job: &NewGenerationJob) -> Result<()>;
}
