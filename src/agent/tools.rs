//! Tool schema and dispatch — builds the function declarations handed to the
//! remote assistant and maps its tool calls back onto local handlers.
//!
//! Dispatch never fails the enclosing chat request: an unknown function name
//! or a failing handler produces an error-shaped output string, so the remote
//! run can see the partial failure and react to it.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::assistant::types::{ToolCall, ToolDefinition, ToolOutput};
use crate::error::{Error, Result};
use crate::generation::{GenerationBackend, ImageJob, VideoJob};
use crate::store::types::{JobKind, NewGenerationJob, NewScene};
use crate::store::ProjectStore;
use crate::trace::TraceEvent;

// ── Tool names ─────────────────────────────────────────────────────

/// The closed set of functions the assistant may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    GetProjectDetails,
    UpdateSceneScript,
    CreateScene,
    CreateMultipleScenes,
    TriggerImageGeneration,
    TriggerVideoGeneration,
}

impl ToolName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "get_project_details" => Some(Self::GetProjectDetails),
            "update_scene_script" => Some(Self::UpdateSceneScript),
            "create_scene" => Some(Self::CreateScene),
            "create_multiple_scenes" => Some(Self::CreateMultipleScenes),
            "trigger_image_generation" => Some(Self::TriggerImageGeneration),
            "trigger_video_generation" => Some(Self::TriggerVideoGeneration),
            _ => None,
        }
    }
}

// ── Argument shapes ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GetProjectDetailsArgs {
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateSceneScriptArgs {
    scene_id: String,
    script_content: String,
}

#[derive(Debug, Deserialize)]
struct CreateSceneArgs {
    project_id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
pub struct SceneSpec {
    pub title: String,
    pub script: String,
    pub scene_order: i64,
}

#[derive(Debug, Deserialize)]
struct CreateMultipleScenesArgs {
    project_id: String,
    scenes: Vec<SceneSpec>,
}

#[derive(Debug, Deserialize)]
struct TriggerImageGenerationArgs {
    scene_id: String,
    image_prompt: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct TriggerVideoGenerationArgs {
    scene_id: String,
}

// ── Dispatcher ─────────────────────────────────────────────────────

/// Maps tool calls onto handlers backed by the project store and the
/// generation backends. Explicitly constructed and shared by reference;
/// carries no per-request state.
pub struct ToolDispatcher {
    store: Arc<dyn ProjectStore>,
    generation: Arc<dyn GenerationBackend>,
}

impl ToolDispatcher {
    pub fn new(store: Arc<dyn ProjectStore>, generation: Arc<dyn GenerationBackend>) -> Self {
        Self { store, generation }
    }

    /// Execute every call in the batch independently. One failing call never
    /// aborts the batch; it yields an error-shaped output for that call only.
    pub async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            outputs.push(self.dispatch(call).await);
        }
        outputs
    }

    /// Execute a single call, serializing the handler result (or the error
    /// shape) into the output string the remote API expects.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutput {
        let name = call.function.name.as_str();
        let start = Instant::now();

        let outcome = match ToolName::parse(name) {
            Some(tool) => self
                .execute(tool, &call.function.arguments)
                .await
                .map_err(|e| format!("error executing tool {name}: {e}")),
            None => Err(format!("unknown tool function: {name}")),
        };

        let (value, is_error) = match outcome {
            Ok(value) => (value, false),
            Err(message) => {
                tracing::warn!(tool = name, call_id = %call.id, error = %message, "tool call failed");
                (json!({ "error": message }), true)
            }
        };

        TraceEvent::ToolDispatched {
            tool_call_id: call.id.clone(),
            function: name.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            is_error,
        }
        .emit();

        ToolOutput {
            tool_call_id: call.id.clone(),
            output: value.to_string(),
        }
    }

    async fn execute(&self, tool: ToolName, arguments: &str) -> Result<Value> {
        match tool {
            ToolName::GetProjectDetails => {
                let args: GetProjectDetailsArgs = serde_json::from_str(arguments)?;
                self.get_project_details(&args.project_id).await
            }
            ToolName::UpdateSceneScript => {
                let args: UpdateSceneScriptArgs = serde_json::from_str(arguments)?;
                self.update_scene_script(&args.scene_id, &args.script_content)
                    .await
            }
            ToolName::CreateScene => {
                let args: CreateSceneArgs = serde_json::from_str(arguments)?;
                self.create_scene(&args.project_id, &args.title).await
            }
            ToolName::CreateMultipleScenes => {
                let args: CreateMultipleScenesArgs = serde_json::from_str(arguments)?;
                self.create_multiple_scenes(&args.project_id, &args.scenes)
                    .await
            }
            ToolName::TriggerImageGeneration => {
                let args: TriggerImageGenerationArgs = serde_json::from_str(arguments)?;
                self.trigger_image_generation(&args.scene_id, &args.image_prompt, &args.version)
                    .await
            }
            ToolName::TriggerVideoGeneration => {
                let args: TriggerVideoGenerationArgs = serde_json::from_str(arguments)?;
                self.trigger_video_generation(&args.scene_id).await
            }
        }
    }

    // ── Handlers ───────────────────────────────────────────────────

    pub async fn get_project_details(&self, project_id: &str) -> Result<Value> {
        let Some(mut project) = self.store.project_details(project_id).await? else {
            return Ok(json!({ "error": format!("project {project_id} not found") }));
        };
        project.scenes.sort_by_key(|s| s.scene_order);

        let scenes: Vec<Value> = project
            .scenes
            .iter()
            .map(|s| json!({ "id": s.id, "title": s.title }))
            .collect();

        Ok(json!({
            "project_id": project.id,
            "title": project.title,
            "scenes": scenes,
        }))
    }

    pub async fn update_scene_script(&self, scene_id: &str, script_content: &str) -> Result<Value> {
        self.store
            .update_scene_script(scene_id, script_content)
            .await?;
        Ok(json!({
            "success": true,
            "scene_id": scene_id,
            "message": "scene script updated",
        }))
    }

    pub async fn create_scene(&self, project_id: &str, title: &str) -> Result<Value> {
        let next_order = self.store.max_scene_order(project_id).await?.unwrap_or(0) + 1;
        let scene = NewScene::empty(project_id, title, next_order);
        let ids = self.store.insert_scenes(std::slice::from_ref(&scene)).await?;
        let scene_id = ids
            .into_iter()
            .next()
            .ok_or_else(|| Error::Store("scene insert returned no id".into()))?;

        Ok(json!({
            "success": true,
            "scene_id": scene_id,
            "message": "new scene created",
        }))
    }

    pub async fn create_multiple_scenes(
        &self,
        project_id: &str,
        scenes: &[SceneSpec],
    ) -> Result<Value> {
        let rows: Vec<NewScene> = scenes
            .iter()
            .map(|s| NewScene {
                project_id: project_id.to_string(),
                title: s.title.clone(),
                script: s.script.clone(),
                description: String::new(),
                voice_over_text: String::new(),
                image_prompt: String::new(),
                scene_order: s.scene_order,
            })
            .collect();

        let ids = self.store.insert_scenes(&rows).await?;
        Ok(json!({
            "success": true,
            "scene_ids": ids,
            "message": "new scenes created",
        }))
    }

    pub async fn trigger_image_generation(
        &self,
        scene_id: &str,
        image_prompt: &str,
        version: &str,
    ) -> Result<Value> {
        let Some(media) = self.store.scene_media(scene_id).await? else {
            return Ok(json!({ "success": false, "error": format!("scene {scene_id} not found") }));
        };
        let Some(product_image_url) = media.product_image_url.filter(|u| !u.is_empty()) else {
            return Ok(json!({
                "success": false,
                "error": format!("product image url not found for scene {scene_id}"),
            }));
        };

        let ticket = self
            .generation
            .submit_image_job(&ImageJob {
                scene_id: scene_id.to_string(),
                prompt: image_prompt.to_string(),
                product_image_url,
                version: version.to_string(),
            })
            .await?;

        self.store
            .insert_generation_job(&NewGenerationJob {
                scene_id: scene_id.to_string(),
                kind: JobKind::Image,
                provider_request_id: ticket.request_id.clone(),
                status: "submitted".into(),
            })
            .await?;

        Ok(json!({
            "success": true,
            "scene_id": scene_id,
            "request_id": ticket.request_id,
            "message": "image generation started",
        }))
    }

    pub async fn trigger_video_generation(&self, scene_id: &str) -> Result<Value> {
        let Some(media) = self.store.scene_media(scene_id).await? else {
            return Ok(json!({ "success": false, "error": format!("scene {scene_id} not found") }));
        };
        let image_url = media.image_url.filter(|u| !u.is_empty());
        let description = media.description.filter(|d| !d.is_empty());
        let (Some(image_url), Some(description)) = (image_url, description) else {
            return Ok(json!({
                "success": false,
                "error": format!("image url or description not found for scene {scene_id}"),
            }));
        };

        let ticket = self
            .generation
            .submit_video_job(&VideoJob {
                scene_id: scene_id.to_string(),
                image_url,
                description,
            })
            .await?;

        self.store
            .insert_generation_job(&NewGenerationJob {
                scene_id: scene_id.to_string(),
                kind: JobKind::Video,
                provider_request_id: ticket.request_id.clone(),
                status: "submitted".into(),
            })
            .await?;

        Ok(json!({
            "success": true,
            "scene_id": scene_id,
            "request_id": ticket.request_id,
            "message": "video generation started",
        }))
    }

}

// ── Declared tool schema ───────────────────────────────────────────

/// Build the fixed set of tool declarations handed to the remote assistant
/// on every run. The remote API needs this schema verbatim to know what it
/// may call.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_project_details".into(),
            description: "Get the project title and a list of its scenes (ID and title).".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "project_id": {
                        "type": "string",
                        "description": "The ID of the project to fetch details for."
                    }
                },
                "required": ["project_id"]
            }),
        },
        ToolDefinition {
            name: "update_scene_script".into(),
            description: "Update the script content for a specific scene.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "scene_id": {
                        "type": "string",
                        "description": "The ID of the scene to update."
                    },
                    "script_content": {
                        "type": "string",
                        "description": "The new script content for the scene."
                    }
                },
                "required": ["scene_id", "script_content"]
            }),
        },
        ToolDefinition {
            name: "create_scene".into(),
            description: "Create a new scene within a project.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "project_id": {
                        "type": "string",
                        "description": "The ID of the project to add the scene to."
                    },
                    "title": {
                        "type": "string",
                        "description": "The title for the new scene."
                    }
                },
                "required": ["project_id", "title"]
            }),
        },
        ToolDefinition {
            name: "create_multiple_scenes".into(),
            description:
                "Creates multiple new scenes within a project based on provided script content for each."
                    .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "project_id": {
                        "type": "string",
                        "description": "The ID of the project to add the scenes to."
                    },
                    "scenes": {
                        "type": "array",
                        "description": "A list of scene objects to create.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string", "description": "Title for the scene (e.g., 'Scene 1')" },
                                "script": { "type": "string", "description": "The script content for this specific scene." },
                                "scene_order": { "type": "integer", "description": "The order number for this scene." }
                            },
                            "required": ["title", "script", "scene_order"]
                        }
                    }
                },
                "required": ["project_id", "scenes"]
            }),
        },
        ToolDefinition {
            name: "trigger_image_generation".into(),
            description:
                "Starts the process to generate a scene image using a specific prompt and product image."
                    .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "scene_id": {
                        "type": "string",
                        "description": "The ID of the scene for which to generate the image."
                    },
                    "image_prompt": {
                        "type": "string",
                        "description": "The detailed prompt to use for image generation."
                    },
                    "version": {
                        "type": "string",
                        "enum": ["v1", "v2"],
                        "description": "The generation model version to use (v1 or v2)."
                    }
                },
                "required": ["scene_id", "image_prompt", "version"]
            }),
        },
        ToolDefinition {
            name: "trigger_video_generation".into(),
            description:
                "Starts the process to generate a scene video using the scene image and description."
                    .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "scene_id": {
                        "type": "string",
                        "description": "The ID of the scene for which to generate the video."
                    }
                },
                "required": ["scene_id"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::types::ToolFunction;
    use crate::test_support::{FakeGeneration, FakeStore};

    fn dispatcher(store: Arc<FakeStore>, generation: Arc<FakeGeneration>) -> ToolDispatcher {
        ToolDispatcher::new(store, generation)
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            function: ToolFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    #[tokio::test]
    async fn unknown_function_yields_error_output() {
        let d = dispatcher(Arc::new(FakeStore::default()), Arc::new(FakeGeneration::default()));
        let out = d.dispatch(&call("call_1", "drop_database", "{}")).await;

        assert_eq!(out.tool_call_id, "call_1");
        let value: Value = serde_json::from_str(&out.output).unwrap();
        assert_eq!(
            value["error"],
            json!("unknown tool function: drop_database")
        );
    }

    #[tokio::test]
    async fn batch_survives_one_failing_call() {
        let store = Arc::new(FakeStore::default());
        store.add_scene("s1", "p1", 1);
        let d = dispatcher(store, Arc::new(FakeGeneration::default()));

        let calls = vec![
            call(
                "call_1",
                "update_scene_script",
                r#"{"scene_id":"s1","script_content":"fade in"}"#,
            ),
            // malformed arguments: missing script_content
            call("call_2", "update_scene_script", r#"{"scene_id":"s1"}"#),
            call("call_3", "nonexistent_tool", "{}"),
        ];

        let outputs = d.dispatch_all(&calls).await;
        assert_eq!(outputs.len(), 3);

        let ok: Value = serde_json::from_str(&outputs[0].output).unwrap();
        assert_eq!(ok["success"], json!(true));

        let bad: Value = serde_json::from_str(&outputs[1].output).unwrap();
        assert!(bad["error"].as_str().unwrap().contains("update_scene_script"));

        let unknown: Value = serde_json::from_str(&outputs[2].output).unwrap();
        assert!(unknown["error"].as_str().unwrap().contains("nonexistent_tool"));
    }

    #[tokio::test]
    async fn create_scene_starts_ordering_at_one() {
        let store = Arc::new(FakeStore::default());
        let d = dispatcher(store.clone(), Arc::new(FakeGeneration::default()));

        let value = d.create_scene("p1", "Intro").await.unwrap();
        assert_eq!(value["success"], json!(true));
        assert!(value["scene_id"].as_str().is_some());
        assert_eq!(store.scene_orders("p1"), vec![1]);

        // Second scene appends after the first.
        d.create_scene("p1", "Middle").await.unwrap();
        assert_eq!(store.scene_orders("p1"), vec![1, 2]);
    }

    #[tokio::test]
    async fn create_multiple_scenes_inserts_batch() {
        let store = Arc::new(FakeStore::default());
        let d = dispatcher(store.clone(), Arc::new(FakeGeneration::default()));

        let args = r#"{
            "project_id": "p1",
            "scenes": [
                {"title": "Scene 1", "script": "open", "scene_order": 1},
                {"title": "Scene 2", "script": "close", "scene_order": 2}
            ]
        }"#;
        let out = d.dispatch(&call("call_1", "create_multiple_scenes", args)).await;
        let value: Value = serde_json::from_str(&out.output).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["scene_ids"].as_array().unwrap().len(), 2);
        assert_eq!(store.scene_orders("p1"), vec![1, 2]);
    }

    #[tokio::test]
    async fn image_generation_requires_product_image() {
        let store = Arc::new(FakeStore::default());
        store.add_scene("s1", "p1", 1); // no product image url
        let d = dispatcher(store, Arc::new(FakeGeneration::default()));

        let value = d
            .trigger_image_generation("s1", "a red chair", "v2")
            .await
            .unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value["error"].as_str().unwrap().contains("product image url"));
    }

    #[tokio::test]
    async fn image_generation_records_job() {
        let store = Arc::new(FakeStore::default());
        store.add_scene("s1", "p1", 1);
        store.set_scene_media("s1", Some("https://cdn/p.png"), None, None);
        let generation = Arc::new(FakeGeneration::default());
        let d = dispatcher(store.clone(), generation.clone());

        let value = d
            .trigger_image_generation("s1", "a red chair", "v2")
            .await
            .unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(generation.image_jobs.lock().len(), 1);

        let jobs = store.jobs.lock();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, JobKind::Image);
        assert_eq!(jobs[0].scene_id, "s1");
    }

    #[tokio::test]
    async fn video_generation_requires_image_and_description() {
        let store = Arc::new(FakeStore::default());
        store.add_scene("s1", "p1", 1);
        store.set_scene_media("s1", None, Some("https://cdn/img.png"), None);
        let d = dispatcher(store, Arc::new(FakeGeneration::default()));

        let value = d.trigger_video_generation("s1").await.unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value["error"]
            .as_str()
            .unwrap()
            .contains("image url or description"));
    }

    #[tokio::test]
    async fn project_details_sorts_scenes_by_order() {
        let store = Arc::new(FakeStore::default());
        store.add_project("p1", "Launch video");
        store.add_scene("s2", "p1", 2);
        store.add_scene("s1", "p1", 1);
        let d = dispatcher(store, Arc::new(FakeGeneration::default()));

        let value = d.get_project_details("p1").await.unwrap();
        let ids: Vec<&str> = value["scenes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn schema_declares_all_six_tools() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), 6);
        for def in &defs {
            assert!(ToolName::parse(&def.name).is_some(), "unmapped tool {}", def.name);
            assert_eq!(def.parameters["type"], json!("object"));
        }
    }
}
