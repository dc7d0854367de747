pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::{Run, ThreadMessage, ToolDefinition, ToolOutput};

/// Seam over the hosted assistant API.
///
/// The production implementation is [`client::AssistantClient`]; tests drive
/// the orchestrator with scripted fakes instead.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create a new conversation thread, returning its id.
    async fn create_thread(&self) -> Result<String>;

    /// Append a message with the given role to a thread.
    async fn add_message(&self, thread_id: &str, role: &str, content: &str) -> Result<()>;

    /// Start a run of `assistant_id` over the thread, declaring the callable
    /// tools.
    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        tools: &[ToolDefinition],
    ) -> Result<Run>;

    /// Re-fetch the current state of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Submit all tool outputs for a paused run in one call.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run>;

    /// Cancel an in-flight run.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// List the most recent messages on a thread, newest first.
    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>>;
}
