use serde::{Deserialize, Serialize};

// ── Thread mapping (chat_sessions) ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRow {
    pub project_id: String,
    pub openai_thread_id: String,
}

// ── Projects & scenes (canvas_projects / canvas_scenes) ────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDetails {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "canvas_scenes")]
    pub scenes: Vec<SceneSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scene_order: i64,
}

/// Insert payload for a scene row. Fields the assistant does not provide are
/// written as empty strings, matching the table defaults the frontend
/// expects.
#[derive(Debug, Clone, Serialize)]
pub struct NewScene {
    pub project_id: String,
    pub title: String,
    pub script: String,
    pub description: String,
    pub voice_over_text: String,
    pub image_prompt: String,
    pub scene_order: i64,
}

impl NewScene {
    pub fn empty(project_id: &str, title: &str, scene_order: i64) -> Self {
        Self {
            project_id: project_id.to_string(),
            title: title.to_string(),
            script: String::new(),
            description: String::new(),
            voice_over_text: String::new(),
            image_prompt: String::new(),
            scene_order,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneMedia {
    #[serde(default)]
    pub product_image_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingScene {
    pub id: String,
    #[serde(default)]
    pub scene_order: i64,
    #[serde(default)]
    pub image_prompt: Option<String>,
}

// ── Scene status ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    PendingGeneration,
    GeneratingImage,
    GeneratingVideo,
    Completed,
    Failed,
}

impl SceneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingGeneration => "pending_generation",
            Self::GeneratingImage => "generating_image",
            Self::GeneratingVideo => "generating_video",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

// ── Generation jobs ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Image,
    Video,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGenerationJob {
    pub scene_id: String,
    pub kind: JobKind,
    pub provider_request_id: String,
    pub status: String,
}

// ── Generic row shapes ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct IdRow {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneOrderRow {
    #[serde(default)]
    pub scene_order: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneProjectRow {
    pub project_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadIdRow {
    pub openai_thread_id: String,
}
