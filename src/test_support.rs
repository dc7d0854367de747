//! Scripted in-memory fakes for the seam traits, shared by the unit tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::assistant::types::{
    Run, RunStatus, ThreadMessage, ToolDefinition, ToolOutput,
};
use crate::assistant::AssistantApi;
use crate::error::{Error, Result};
use crate::generation::{GenerationBackend, ImageJob, JobTicket, VideoJob};
use crate::store::types::*;
use crate::store::ProjectStore;

// ── Fake store ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeScene {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub scene_order: i64,
    pub script: String,
    pub status: SceneStatus,
    pub error_message: Option<String>,
    pub image_prompt: String,
    pub product_image_url: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct FakeStore {
    pub threads: Mutex<HashMap<String, String>>,
    pub projects: Mutex<HashMap<String, String>>,
    pub scenes: Mutex<Vec<FakeScene>>,
    pub jobs: Mutex<Vec<NewGenerationJob>>,
    pub fail_save_mapping: Mutex<bool>,
    pub save_mapping_winner: Mutex<Option<String>>,
    next_scene_id: Mutex<u32>,
}

impl FakeStore {
    pub fn add_project(&self, id: &str, title: &str) {
        self.projects.lock().insert(id.into(), title.into());
    }

    pub fn add_scene(&self, id: &str, project_id: &str, scene_order: i64) {
        self.scenes.lock().push(FakeScene {
            id: id.into(),
            project_id: project_id.into(),
            title: format!("Scene {scene_order}"),
            scene_order,
            script: String::new(),
            status: SceneStatus::PendingGeneration,
            error_message: None,
            image_prompt: String::new(),
            product_image_url: None,
            image_url: None,
            description: None,
        });
    }

    pub fn set_scene_media(
        &self,
        id: &str,
        product_image_url: Option<&str>,
        image_url: Option<&str>,
        description: Option<&str>,
    ) {
        let mut scenes = self.scenes.lock();
        let scene = scenes.iter_mut().find(|s| s.id == id).expect("scene");
        scene.product_image_url = product_image_url.map(Into::into);
        scene.image_url = image_url.map(Into::into);
        scene.description = description.map(Into::into);
    }

    pub fn set_image_prompt(&self, id: &str, prompt: &str) {
        let mut scenes = self.scenes.lock();
        let scene = scenes.iter_mut().find(|s| s.id == id).expect("scene");
        scene.image_prompt = prompt.into();
    }

    pub fn scene_orders(&self, project_id: &str) -> Vec<i64> {
        let mut orders: Vec<i64> = self
            .scenes
            .lock()
            .iter()
            .filter(|s| s.project_id == project_id)
            .map(|s| s.scene_order)
            .collect();
        orders.sort();
        orders
    }

    pub fn scene_script(&self, id: &str) -> Option<String> {
        self.scenes
            .lock()
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.script.clone())
    }

    pub fn scene_status(&self, id: &str) -> Option<(SceneStatus, Option<String>)> {
        self.scenes
            .lock()
            .iter()
            .find(|s| s.id == id)
            .map(|s| (s.status, s.error_message.clone()))
    }
}

#[async_trait]
impl ProjectStore for FakeStore {
    async fn thread_for_project(&self, project_id: &str) -> Result<Option<String>> {
        Ok(self.threads.lock().get(project_id).cloned())
    }

    async fn save_thread_mapping(&self, project_id: &str, thread_id: &str) -> Result<String> {
        if *self.fail_save_mapping.lock() {
            return Err(Error::Store("store unavailable".into()));
        }
        if let Some(winner) = self.save_mapping_winner.lock().clone() {
            self.threads.lock().insert(project_id.into(), winner.clone());
            return Ok(winner);
        }
        self.threads
            .lock()
            .insert(project_id.into(), thread_id.into());
        Ok(thread_id.to_string())
    }

    async fn project_details(&self, project_id: &str) -> Result<Option<ProjectDetails>> {
        let Some(title) = self.projects.lock().get(project_id).cloned() else {
            return Ok(None);
        };
        let scenes = self
            .scenes
            .lock()
            .iter()
            .filter(|s| s.project_id == project_id)
            .map(|s| SceneSummary {
                id: s.id.clone(),
                title: Some(s.title.clone()),
                scene_order: s.scene_order,
            })
            .collect();
        Ok(Some(ProjectDetails {
            id: project_id.to_string(),
            title: Some(title),
            scenes,
        }))
    }

    async fn update_scene_script(&self, scene_id: &str, script: &str) -> Result<()> {
        if let Some(scene) = self.scenes.lock().iter_mut().find(|s| s.id == scene_id) {
            scene.script = script.to_string();
        }
        Ok(())
    }

    async fn max_scene_order(&self, project_id: &str) -> Result<Option<i64>> {
        Ok(self
            .scenes
            .lock()
            .iter()
            .filter(|s| s.project_id == project_id)
            .map(|s| s.scene_order)
            .max())
    }

    async fn insert_scenes(&self, scenes: &[NewScene]) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let id = {
                let mut next = self.next_scene_id.lock();
                *next += 1;
                format!("scene_{next}", next = *next)
            };
            self.scenes.lock().push(FakeScene {
                id: id.clone(),
                project_id: scene.project_id.clone(),
                title: scene.title.clone(),
                scene_order: scene.scene_order,
                script: scene.script.clone(),
                status: SceneStatus::PendingGeneration,
                error_message: None,
                image_prompt: scene.image_prompt.clone(),
                product_image_url: None,
                image_url: None,
                description: None,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn scene_media(&self, scene_id: &str) -> Result<Option<SceneMedia>> {
        Ok(self
            .scenes
            .lock()
            .iter()
            .find(|s| s.id == scene_id)
            .map(|s| SceneMedia {
                product_image_url: s.product_image_url.clone(),
                image_url: s.image_url.clone(),
                description: s.description.clone(),
            }))
    }

    async fn update_scene_status(
        &self,
        scene_id: &str,
        status: SceneStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        if let Some(scene) = self.scenes.lock().iter_mut().find(|s| s.id == scene_id) {
            scene.status = status;
            scene.error_message = error_message.map(Into::into);
        }
        Ok(())
    }

    async fn pending_scenes(&self, project_id: &str) -> Result<Vec<PendingScene>> {
        let mut pending: Vec<PendingScene> = self
            .scenes
            .lock()
            .iter()
            .filter(|s| s.project_id == project_id && s.status == SceneStatus::PendingGeneration)
            .map(|s| PendingScene {
                id: s.id.clone(),
                scene_order: s.scene_order,
                image_prompt: Some(s.image_prompt.clone()),
            })
            .collect();
        pending.sort_by_key(|s| s.scene_order);
        Ok(pending)
    }

    async fn scene_project(&self, scene_id: &str) -> Result<Option<String>> {
        Ok(self
            .scenes
            .lock()
            .iter()
            .find(|s| s.id == scene_id)
            .map(|s| s.project_id.clone()))
    }

    async fn insert_generation_job(&self, job: &NewGenerationJob) -> Result<()> {
        self.jobs.lock().push(job.clone());
        Ok(())
    }
}

// ── Fake generation backends ───────────────────────────────────────

#[derive(Default)]
pub struct FakeGeneration {
    pub image_jobs: Mutex<Vec<ImageJob>>,
    pub video_jobs: Mutex<Vec<VideoJob>>,
    pub fail_image: Mutex<bool>,
    pub fail_video: Mutex<bool>,
}

#[async_trait]
impl GenerationBackend for FakeGeneration {
    async fn submit_image_job(&self, job: &ImageJob) -> Result<JobTicket> {
        if *self.fail_image.lock() {
            return Err(Error::Connection("image backend down".into()));
        }
        self.image_jobs.lock().push(job.clone());
        Ok(JobTicket {
            request_id: format!("img_req_{}", self.image_jobs.lock().len()),
        })
    }

    async fn submit_video_job(&self, job: &VideoJob) -> Result<JobTicket> {
        if *self.fail_video.lock() {
            return Err(Error::Connection("video backend down".into()));
        }
        self.video_jobs.lock().push(job.clone());
        Ok(JobTicket {
            request_id: format!("vid_req_{}", self.video_jobs.lock().len()),
        })
    }
}

// ── Scripted assistant ─────────────────────────────────────────────

/// Fake assistant API driven by a scripted sequence of poll results.
/// `retrieve_run` pops the front of the script; an exhausted script keeps
/// answering `in_progress` (useful for timeout tests).
#[derive(Default)]
pub struct ScriptedAssistant {
    pub threads_created: Mutex<u32>,
    pub messages: Mutex<Vec<(String, String, String)>>,
    pub declared_tools: Mutex<Option<usize>>,
    pub submitted: Mutex<Vec<Vec<ToolOutput>>>,
    pub cancelled: Mutex<Vec<String>>,
    create_run: Mutex<Option<Run>>,
    polls: Mutex<VecDeque<Run>>,
    submit_results: Mutex<VecDeque<Result<Run>>>,
    thread_messages: Mutex<Vec<ThreadMessage>>,
}

impl ScriptedAssistant {
    pub fn set_create_run(&self, run: Run) {
        *self.create_run.lock() = Some(run);
    }

    pub fn push_poll(&self, run: Run) {
        self.polls.lock().push_back(run);
    }

    pub fn push_submit_result(&self, result: Result<Run>) {
        self.submit_results.lock().push_back(result);
    }

    pub fn set_messages(&self, messages: Vec<ThreadMessage>) {
        *self.thread_messages.lock() = messages;
    }
}

#[async_trait]
impl AssistantApi for ScriptedAssistant {
    async fn create_thread(&self) -> Result<String> {
        let mut count = self.threads_created.lock();
        *count += 1;
        Ok(format!("thread_{count}", count = *count))
    }

    async fn add_message(&self, thread_id: &str, role: &str, content: &str) -> Result<()> {
        self.messages
            .lock()
            .push((thread_id.into(), role.into(), content.into()));
        Ok(())
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
        tools: &[ToolDefinition],
    ) -> Result<Run> {
        *self.declared_tools.lock() = Some(tools.len());
        Ok(self
            .create_run
            .lock()
            .clone()
            .expect("create_run result not scripted"))
    }

    async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> Result<Run> {
        Ok(self.polls.lock().pop_front().unwrap_or(Run {
            id: run_id.to_string(),
            status: RunStatus::InProgress,
            required_action: None,
            last_error: None,
        }))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        self.submitted.lock().push(outputs.to_vec());
        self.submit_results.lock().pop_front().unwrap_or(Ok(Run {
            id: run_id.to_string(),
            status: RunStatus::InProgress,
            required_action: None,
            last_error: None,
        }))
    }

    async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> Result<Run> {
        self.cancelled.lock().push(run_id.to_string());
        Ok(Run {
            id: run_id.to_string(),
            status: RunStatus::Cancelled,
            required_action: None,
            last_error: None,
        })
    }

    async fn list_messages(&self, _thread_id: &str, _limit: u32) -> Result<Vec<ThreadMessage>> {
        Ok(self.thread_messages.lock().clone())
    }
}
