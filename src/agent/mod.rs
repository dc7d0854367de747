//! The run orchestrator — resolves the project's conversation thread,
//! submits the user message, drives the remote run through its lifecycle
//! (servicing tool-call callbacks on the way), and extracts the final
//! answer.
//!
//! One [`AgentService`] is constructed at startup and shared by reference;
//! every chat request runs its own independent orchestration pass and no run
//! state is shared across requests.

pub mod reply;
pub mod tools;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::assistant::types::{RequiredAction, Run, RunStatus};
use crate::assistant::AssistantApi;
use crate::config::AssistantConfig;
use crate::error::{Error, Result};
use crate::store::ProjectStore;
use crate::trace::TraceEvent;

use tools::{tool_definitions, ToolDispatcher};

// ── Reply payload ──────────────────────────────────────────────────

/// The orchestrator's sole return value, passed through to the HTTP caller.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub thread_id: String,
    pub content: String,
    pub run_id: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
}

// ── Poll cadence ───────────────────────────────────────────────────

/// Timing knobs for the poll loop, split from [`AssistantConfig`] so tests
/// can run the state machine at full speed.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub assistant_id: String,
    pub poll_interval: Duration,
    pub resubmit_interval: Duration,
    pub run_timeout: Duration,
}

impl RunSettings {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            assistant_id: config.assistant_id.clone().unwrap_or_default(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            resubmit_interval: Duration::from_millis(config.resubmit_interval_ms),
            run_timeout: Duration::from_secs(config.run_timeout_secs),
        }
    }
}

// ── Service ────────────────────────────────────────────────────────

pub struct AgentService {
    assistant: Arc<dyn AssistantApi>,
    store: Arc<dyn ProjectStore>,
    dispatcher: Arc<ToolDispatcher>,
    settings: RunSettings,
}

impl AgentService {
    pub fn new(
        settings: RunSettings,
        assistant: Arc<dyn AssistantApi>,
        store: Arc<dyn ProjectStore>,
        dispatcher: Arc<ToolDispatcher>,
    ) -> Self {
        Self {
            assistant,
            store,
            dispatcher,
            settings,
        }
    }

    pub fn dispatcher(&self) -> Arc<ToolDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Checked at first use rather than startup so the service can come up
    /// (and serve notifications/pipeline work) before the assistant exists.
    fn require_assistant_id(&self) -> Result<&str> {
        let id = self.settings.assistant_id.as_str();
        if id.is_empty() || id == "YOUR_OPENAI_ASSISTANT_ID" {
            return Err(Error::Config("assistant id is not configured".into()));
        }
        Ok(id)
    }

    // ── Thread resolution ──────────────────────────────────────────

    /// Map a project to its conversation thread, creating and persisting one
    /// on first contact.
    ///
    /// An explicit thread id from the caller is returned unchecked. The
    /// mapping upsert resolves concurrent first requests to a single winning
    /// row; a failed upsert is logged and the fresh thread id returned
    /// anyway, so the in-flight request survives a persistence outage (the
    /// next request will create a duplicate remote thread).
    pub async fn resolve_thread(
        &self,
        project_id: &str,
        explicit_thread_id: Option<String>,
    ) -> Result<String> {
        if let Some(thread_id) = explicit_thread_id {
            tracing::debug!(project_id, %thread_id, "using caller-supplied thread");
            return Ok(thread_id);
        }

        if let Some(thread_id) = self.store.thread_for_project(project_id).await? {
            TraceEvent::ThreadResolved {
                project_id: project_id.to_string(),
                thread_id: thread_id.clone(),
                created: false,
            }
            .emit();
            return Ok(thread_id);
        }

        let thread_id = self.assistant.create_thread().await?;
        tracing::info!(project_id, %thread_id, "created new thread");

        let resolved = match self.store.save_thread_mapping(project_id, &thread_id).await {
            Ok(winner) => winner,
            Err(e) => {
                tracing::error!(project_id, %thread_id, error = %e, "failed to persist thread mapping");
                thread_id.clone()
            }
        };

        TraceEvent::ThreadResolved {
            project_id: project_id.to_string(),
            thread_id: resolved.clone(),
            created: true,
        }
        .emit();
        Ok(resolved)
    }

    // ── The poll loop ──────────────────────────────────────────────

    /// Process one chat message: append it to the thread, create a run
    /// declaring the tool schema, poll the run to a terminal status while
    /// servicing `requires_action` callbacks, then extract the reply.
    pub async fn process_chat_message(
        &self,
        project_id: &str,
        explicit_thread_id: Option<String>,
        message_text: &str,
    ) -> Result<ChatReply> {
        let assistant_id = self.require_assistant_id()?;
        let thread_id = self.resolve_thread(project_id, explicit_thread_id).await?;

        self.assistant
            .add_message(&thread_id, "user", message_text)
            .await?;

        let mut run = self
            .assistant
            .create_run(&thread_id, assistant_id, &tool_definitions())
            .await?;
        tracing::info!(%thread_id, run_id = %run.id, status = %run.status, "run created");

        let deadline = Instant::now() + self.settings.run_timeout;

        while run.status.is_open() {
            if Instant::now() >= deadline {
                return self.fail_timed_out(&thread_id, &run).await;
            }

            if run.status == RunStatus::RequiresAction {
                run = self.service_required_action(&thread_id, run).await?;
            } else {
                tokio::time::sleep(self.settings.poll_interval).await;
            }

            run = self.assistant.retrieve_run(&thread_id, &run.id).await?;
            TraceEvent::RunPolled {
                run_id: run.id.clone(),
                status: run.status.to_string(),
            }
            .emit();
        }

        match run.status {
            RunStatus::Completed => {
                let messages = self.assistant.list_messages(&thread_id, 10).await?;
                let content = reply::extract_reply(&messages, &run.id);
                if content.is_empty() {
                    tracing::warn!(run_id = %run.id, "run completed without an assistant message");
                }
                Ok(ChatReply {
                    thread_id,
                    content,
                    run_id: run.id,
                    status: run.status,
                    required_action: None,
                })
            }
            RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired => {
                let message = match &run.last_error {
                    Some(err) => match &err.code {
                        Some(code) => format!("{} (code: {code})", err.message),
                        None => err.message.clone(),
                    },
                    None => "no error details reported".into(),
                };
                tracing::error!(run_id = %run.id, status = %run.status, %message, "run ended in failure");
                Err(Error::TerminalRun {
                    run_id: run.id,
                    status: run.status,
                    message,
                })
            }
            // Unreachable if the status enumeration is exhaustive; kept so an
            // invariant violation surfaces as a distinct error.
            other => Err(Error::UnexpectedRunState {
                run_id: run.id,
                status: other.to_string(),
            }),
        }
    }

    /// Dispatch every pending tool call and resubmit the outputs atomically.
    /// A failed resubmission cancels the run so nothing is left orphaned.
    async fn service_required_action(&self, thread_id: &str, run: Run) -> Result<Run> {
        let calls = run
            .required_action
            .as_ref()
            .map(|a| a.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or_default();
        tracing::info!(run_id = %run.id, pending = calls.len(), "run requires action");

        let outputs = self.dispatcher.dispatch_all(calls).await;

        match self
            .assistant
            .submit_tool_outputs(thread_id, &run.id, &outputs)
            .await
        {
            Ok(updated) => {
                tokio::time::sleep(self.settings.resubmit_interval).await;
                Ok(updated)
            }
            Err(e) => {
                tracing::error!(run_id = %run.id, error = %e, "tool output submission failed, cancelling run");
                if let Err(cancel_err) = self.assistant.cancel_run(thread_id, &run.id).await {
                    tracing::warn!(run_id = %run.id, error = %cancel_err, "run cancel failed");
                }
                Err(e)
            }
        }
    }

    /// Best-effort cancel for a run that exhausted the poll budget.
    async fn fail_timed_out(&self, thread_id: &str, run: &Run) -> Result<ChatReply> {
        tracing::error!(run_id = %run.id, "run exceeded poll budget, cancelling");
        if let Err(e) = self.assistant.cancel_run(thread_id, &run.id).await {
            tracing::warn!(run_id = %run.id, error = %e, "run cancel failed");
        }
        Err(Error::RunTimeout {
            run_id: run.id.clone(),
            timeout_secs: self.settings.run_timeout.as_secs(),
        })
    }

    // ── Canvas update notifications ────────────────────────────────

    /// React to a frontend canvas edit: if the scene's project has a thread,
    /// append a system-role note so the assistant sees the change on its
    /// next run. No mapping is not an error.
    pub async fn handle_scene_update(
        &self,
        scene_id: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let Some(project_id) = self.store.scene_project(scene_id).await? else {
            tracing::info!(scene_id, "canvas update for unknown scene, ignoring");
            return Ok(());
        };
        let Some(thread_id) = self.store.thread_for_project(&project_id).await? else {
            tracing::info!(scene_id, %project_id, "canvas update before first chat, no thread to notify");
            return Ok(());
        };

        let note = format!("Canvas update: scene {scene_id} field '{field}' changed to {value}");
        self.assistant
            .add_message(&thread_id, "system", &note)
            .await?;
        tracing::info!(scene_id, %thread_id, field, "canvas update relayed to thread");
        Ok(())
    }
}
